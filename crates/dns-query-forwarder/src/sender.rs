// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships chunks of query events to the collector API.

use crate::config::{ForwarderConfig, RejectionPolicy};
use crate::errors::SendError;
use crate::record::DnsQueryEvent;
use crate::sink::EventSink;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, error};

/// Anything able to deliver one chunk of events.
///
/// Returns whether the chunk should be treated as delivered. Failures are
/// reported through the sender's own sink and never abort the run.
#[async_trait]
pub trait ChunkSender: Send + Sync {
    async fn send(&self, events: &[DnsQueryEvent]) -> bool;
}

#[derive(Clone)]
pub struct ApiSender {
    client: reqwest::Client,
    endpoint: String,
    rejection_policy: RejectionPolicy,
    sink: Arc<dyn EventSink>,
}

impl ApiSender {
    #[must_use]
    pub fn new(config: &ForwarderConfig, sink: Arc<dyn EventSink>) -> Self {
        ApiSender {
            client: build_client(config),
            endpoint: config.endpoint(),
            rejection_policy: config.rejection_policy,
            sink,
        }
    }

    /// One POST, no retries. Only a 200 counts as accepted.
    async fn ship(&self, events: &[DnsQueryEvent]) -> Result<(), SendError> {
        let body =
            serde_json::to_vec(events).map_err(|e| SendError::Serialization(e.to_string()))?;
        debug!("Posting {} events ({} bytes)", events.len(), body.len());

        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.without_url().to_string()))?;

        match resp.status() {
            StatusCode::OK => Ok(()),
            status => Err(SendError::Rejected {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl ChunkSender for ApiSender {
    async fn send(&self, events: &[DnsQueryEvent]) -> bool {
        match self.ship(events).await {
            Ok(()) => {
                self.sink.info("Data send to collector API successfully");
                true
            }
            Err(e @ SendError::Rejected { .. }) => {
                self.sink.error(&e.to_string());
                self.rejection_policy == RejectionPolicy::ReportSuccess
            }
            Err(e) => {
                self.sink.error(&e.to_string());
                false
            }
        }
    }
}

fn build_client(config: &ForwarderConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}, using reqwest defaults", e);
            reqwest::Client::new()
        }
    }
}
