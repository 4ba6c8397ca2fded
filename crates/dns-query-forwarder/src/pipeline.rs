// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Drives a whole run: read, then parse and send chunk by chunk, then rank.
//!
//! ```text
//!   Read ──> ( Chunk ──> Parse ──> Send )* ──> Aggregate ──> StatsReport
//! ```
//!
//! Chunks are handled strictly in order and each send is awaited before the
//! next chunk is parsed. A chunk that fails to deliver is logged and the run
//! moves on; only an empty result (or `AbortRun`) ends the run with an error.

use crate::batcher::Chunks;
use crate::config::{ForwarderConfig, ParseFailurePolicy};
use crate::errors::PipelineError;
use crate::record::{self, DnsQueryEvent, StatEntry};
use crate::sender::{ApiSender, ChunkSender};
use crate::sink::EventSink;
use crate::stats::{self, RankedEntry, StatsReport};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct Pipeline<S, L> {
    sender: S,
    sink: L,
    chunk_size: usize,
    parse_failure_policy: ParseFailurePolicy,
}

impl Pipeline<ApiSender, Arc<dyn EventSink>> {
    /// Pipeline that ships to the configured collector and reports to `sink`.
    #[must_use]
    pub fn from_config(config: &ForwarderConfig, sink: Arc<dyn EventSink>) -> Self {
        let sender = ApiSender::new(config, Arc::clone(&sink));
        Self::new(config, sender, sink)
    }
}

impl<S: ChunkSender, L: EventSink> Pipeline<S, L> {
    pub fn new(config: &ForwarderConfig, sender: S, sink: L) -> Self {
        Pipeline {
            sender,
            sink,
            chunk_size: config.chunk_size,
            parse_failure_policy: config.parse_failure_policy,
        }
    }

    pub async fn run_file(&self, path: &Path) -> Result<StatsReport, PipelineError> {
        let file = File::open(path)?;
        self.run(BufReader::new(file)).await
    }

    pub async fn run<R: BufRead>(&self, reader: R) -> Result<StatsReport, PipelineError> {
        let lines = read_lines(reader)?;
        self.sink
            .info(&format!("Total lines to process: {}", lines.len()));

        let mut stat_entries: Vec<StatEntry> = Vec::with_capacity(lines.len());
        for (index, chunk) in Chunks::new(lines, self.chunk_size)?.enumerate() {
            let number = index + 1;
            self.sink.info(&format!(
                "Processing chunk {number} with {} lines",
                chunk.len()
            ));

            let Some(events) = self.parse_chunk(number, &chunk, &mut stat_entries)? else {
                continue;
            };
            if events.is_empty() {
                self.sink
                    .error(&format!("Chunk {number} has no valid records, nothing sent"));
                continue;
            }

            if self.sender.send(&events).await {
                debug!("Chunk {number} delivered ({} events)", events.len());
            } else {
                self.sink.error(&format!(
                    "Chunk {number} was not delivered ({} events)",
                    events.len()
                ));
            }
        }

        let report = match stats::aggregate(&stat_entries) {
            Ok(report) => report,
            Err(e) => {
                self.sink.error(&format!("Unable to compute stats: {e}"));
                return Err(e.into());
            }
        };
        self.sink.info(&format!(
            "Processing complete. Total records: {}. Top 5 client IPs: [{}]. Top 5 hosts: [{}]",
            report.total_records,
            join(&report.top_client_ips),
            join(&report.top_hosts),
        ));
        Ok(report)
    }

    /// Parses one chunk, appending its stat entries to `stat_entries`.
    ///
    /// Returns `None` when the chunk is dropped under `AbortChunk`; in that case
    /// none of its stat entries are kept either.
    fn parse_chunk(
        &self,
        number: usize,
        chunk: &[Vec<u8>],
        stat_entries: &mut Vec<StatEntry>,
    ) -> Result<Option<Vec<DnsQueryEvent>>, PipelineError> {
        let mut events = Vec::with_capacity(chunk.len());
        let mut chunk_stats = Vec::with_capacity(chunk.len());
        let mut failures = 0usize;

        for raw in chunk {
            match record::parse_line(raw) {
                Ok((event, stat)) => {
                    events.push(event);
                    chunk_stats.push(stat);
                }
                Err(e) if self.parse_failure_policy == ParseFailurePolicy::AbortRun => {
                    return Err(e.into());
                }
                Err(e) => {
                    self.sink.error(&e.to_string());
                    failures += 1;
                }
            }
        }

        if failures > 0 && self.parse_failure_policy == ParseFailurePolicy::AbortChunk {
            self.sink.error(&format!(
                "Dropping chunk {number}: {failures} of {} lines failed to parse",
                chunk.len()
            ));
            return Ok(None);
        }

        stat_entries.append(&mut chunk_stats);
        Ok(Some(events))
    }
}

/// Reads every non-blank line into memory, without its line terminator.
///
/// Blank lines carry no record, so they are neither parse failures nor part
/// of the "Total lines to process" count.
fn read_lines<R: BufRead>(reader: R) -> std::io::Result<Vec<Vec<u8>>> {
    let mut lines = Vec::new();
    for line in reader.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        lines.push(line);
    }
    Ok(lines)
}

fn join(entries: &[RankedEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
