// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Where the pipeline reports progress and failures.
//!
//! The pipeline and sender never talk to a global logger directly; they are
//! handed an [`EventSink`]. Production code uses [`TracingSink`], which feeds
//! the operational log through `tracing`. Tests can use [`RecordingSink`].

use std::sync::{Arc, Mutex};

pub trait EventSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing` at INFO / ERROR.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "dns_query_forwarder", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "dns_query_forwarder", "{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Info(String),
    Error(String),
}

/// Keeps every message in memory, in emission order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    entries: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Recorded> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::Error(message) => Some(message),
                Recorded::Info(_) => None,
            })
            .collect()
    }

    #[must_use]
    pub fn infos(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::Info(message) => Some(message),
                Recorded::Error(_) => None,
            })
            .collect()
    }

    fn push(&self, entry: Recorded) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

impl EventSink for RecordingSink {
    fn info(&self, message: &str) {
        self.push(Recorded::Info(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(Recorded::Error(message.to_string()));
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}
