// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::ConfigError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "https://api.lumu.io";
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_LOG_FILE: &str = "./logs/lumu.log";
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// What the pipeline does with a line that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseFailurePolicy {
    /// Log the failure, drop the line, keep the rest of its chunk.
    #[default]
    Skip,
    /// Log every failure and drop the whole chunk; later chunks still run.
    AbortChunk,
    /// Stop the run at the first failing line.
    AbortRun,
}

impl FromStr for ParseFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort-chunk" => Ok(Self::AbortChunk),
            "abort-run" => Ok(Self::AbortRun),
            other => Err(ConfigError::Invalid(format!(
                "Invalid parse error policy '{other}'. Must be one of: skip, abort-chunk, abort-run"
            ))),
        }
    }
}

/// How a non-200 collector response is reported back to the pipeline.
///
/// `ReportSuccess` keeps the historical behavior: the rejection is logged as an
/// error but the chunk still counts as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectionPolicy {
    #[default]
    ReportSuccess,
    ReportFailure,
}

impl FromStr for RejectionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "report-success" => Ok(Self::ReportSuccess),
            "report-failure" => Ok(Self::ReportFailure),
            other => Err(ConfigError::Invalid(format!(
                "Invalid rejection policy '{other}'. Must be one of: report-success, report-failure"
            ))),
        }
    }
}

/// Configuration for the forwarder, read once at startup and passed down.
#[derive(Clone)]
pub struct ForwarderConfig {
    /// Collector the DNS queries are attributed to
    pub collector_id: String,
    /// Access key appended to the collector URL
    pub client_key: String,
    /// Scheme and host of the collector API
    pub api_host: String,
    /// Lines per transmitted chunk
    pub chunk_size: usize,
    /// Operational log destination
    pub log_file: PathBuf,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// Per-request timeout; `None` leaves the transport default in place
    pub timeout: Option<Duration>,
    pub parse_failure_policy: ParseFailurePolicy,
    pub rejection_policy: RejectionPolicy,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            collector_id: String::new(),
            client_key: String::new(),
            api_host: DEFAULT_API_HOST.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: "info".to_string(),
            timeout: None,
            parse_failure_policy: ParseFailurePolicy::default(),
            rejection_policy: RejectionPolicy::default(),
        }
    }
}

impl fmt::Debug for ForwarderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwarderConfig")
            .field("collector_id", &self.collector_id)
            .field("client_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .field("chunk_size", &self.chunk_size)
            .field("log_file", &self.log_file)
            .field("log_level", &self.log_level)
            .field("timeout", &self.timeout)
            .field("parse_failure_policy", &self.parse_failure_policy)
            .field("rejection_policy", &self.rejection_policy)
            .finish()
    }
}

impl ForwarderConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let collector_id =
            lookup("LUMU_COLLECTOR_ID").ok_or(ConfigError::Missing("LUMU_COLLECTOR_ID"))?;
        let client_key = lookup("LUMU_CLIENT_KEY").ok_or(ConfigError::Missing("LUMU_CLIENT_KEY"))?;
        let api_host = lookup("LUMU_API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string());

        let chunk_size = match lookup("DNS_FORWARDER_CHUNK_SIZE") {
            Some(val) => val.trim().parse::<usize>().map_err(|_| {
                ConfigError::Invalid(format!("DNS_FORWARDER_CHUNK_SIZE is not a number: '{val}'"))
            })?,
            None => DEFAULT_CHUNK_SIZE,
        };
        let log_file = lookup("DNS_FORWARDER_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        let log_level = lookup("DNS_FORWARDER_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|| "info".to_string());
        let timeout = match lookup("DNS_FORWARDER_TIMEOUT_SECS") {
            Some(val) => Some(Duration::from_secs(val.trim().parse::<u64>().map_err(
                |_| ConfigError::Invalid(format!("DNS_FORWARDER_TIMEOUT_SECS is not a number: '{val}'")),
            )?)),
            None => None,
        };
        let parse_failure_policy = lookup("DNS_FORWARDER_ON_PARSE_ERROR")
            .map(|val| val.parse::<ParseFailurePolicy>())
            .transpose()?
            .unwrap_or_default();
        let rejection_policy = lookup("DNS_FORWARDER_ON_REJECTION")
            .map(|val| val.parse::<RejectionPolicy>())
            .transpose()?
            .unwrap_or_default();

        let config = Self {
            collector_id,
            client_key,
            api_host,
            chunk_size,
            log_file,
            log_level,
            timeout,
            parse_failure_policy,
            rejection_policy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collector_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "LUMU_COLLECTOR_ID cannot be empty".to_string(),
            ));
        }

        if self.client_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "LUMU_CLIENT_KEY cannot be empty".to_string(),
            ));
        }

        if !(self.api_host.starts_with("http://") || self.api_host.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "LUMU_API_HOST must be an http(s) URL, got '{}'",
                self.api_host
            )));
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "Chunk size must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Full collector URL, including the access key.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/collectors/{}/dns/queries?key={}",
            self.api_host.trim_end_matches('/'),
            self.collector_id,
            self.client_key
        )
    }
}
