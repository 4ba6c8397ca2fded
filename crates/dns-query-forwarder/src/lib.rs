// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards DNS query logs to a collector API and ranks the top talkers.
//!
//! A run reads a query log, splits it into fixed-size chunks, turns each line
//! into a [`record::DnsQueryEvent`], posts every chunk to the collector, and
//! finally ranks the most frequent hosts and client IPs into a
//! [`stats::StatsReport`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batcher;
pub mod config;
pub mod errors;
pub mod oplog;
pub mod pipeline;
pub mod record;
pub mod sender;
pub mod sink;
pub mod stats;
