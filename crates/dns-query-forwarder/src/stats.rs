// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Top-talker ranking over every parsed record.

use crate::errors::StatsError;
use crate::record::StatEntry;
use hashbrown::HashMap;
use serde::Serialize;
use std::fmt;

pub const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub value: String,
    pub count: usize,
    /// `100 * count / total`, two decimals and a `%` suffix
    pub percentage: String,
}

impl fmt::Display for RankedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.value, self.count, self.percentage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub total_records: usize,
    pub top_client_ips: Vec<RankedEntry>,
    pub top_hosts: Vec<RankedEntry>,
}

/// Frequency counter that remembers the order values were first seen in.
#[derive(Debug, Default)]
struct Counter<'a> {
    index: HashMap<&'a str, usize>,
    counts: Vec<(&'a str, usize)>,
}

impl<'a> Counter<'a> {
    fn add(&mut self, value: &'a str) {
        match self.index.get(value) {
            Some(&slot) => self.counts[slot].1 += 1,
            None => {
                self.index.insert(value, self.counts.len());
                self.counts.push((value, 1));
            }
        }
    }

    /// Highest counts first; equal counts keep first-seen order.
    fn most_common(mut self, n: usize) -> Vec<(&'a str, usize)> {
        // sort_by is stable, which is what keeps ties in insertion order
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts.truncate(n);
        self.counts
    }
}

/// Ranks the top hosts and client IPs across `entries`.
pub fn aggregate(entries: &[StatEntry]) -> Result<StatsReport, StatsError> {
    let total_records = entries.len();
    if total_records == 0 {
        return Err(StatsError::EmptyInput);
    }

    let mut hosts = Counter::default();
    let mut client_ips = Counter::default();
    for entry in entries {
        hosts.add(&entry.host);
        client_ips.add(&entry.client_ip);
    }

    Ok(StatsReport {
        total_records,
        top_client_ips: rank(client_ips, total_records),
        top_hosts: rank(hosts, total_records),
    })
}

fn rank(counter: Counter<'_>, total: usize) -> Vec<RankedEntry> {
    counter
        .most_common(TOP_N)
        .into_iter()
        .map(|(value, count)| RankedEntry {
            value: value.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn percentage(count: usize, total: usize) -> String {
    format!("{:.2}%", (count as f64 / total as f64) * 100.0)
}
