// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for every stage of the forwarding pipeline.

/// Why a raw log line could not be turned into a query event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorReason {
    #[error("expected at least 12 fields, found {found}")]
    TooFewFields { found: usize },

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("malformed client address '{0}'")]
    MalformedAddress(String),

    #[error("line is not valid UTF-8")]
    InvalidEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to parse line '{line}': {reason}")]
pub struct ParseError {
    pub line: String,
    pub reason: ParseErrorReason,
}

/// Failures while shipping a chunk. These never leave the sender; they are
/// logged and folded into its boolean result.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Failed to serialize payload: {0}")]
    Serialization(String),

    #[error("Exception: {0}")]
    Transport(String),

    #[error("Status code: {status}, Response: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("cannot compute stats over zero records")]
    EmptyInput,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("chunk size must be greater than 0")]
    InvalidChunkSize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let error = ParseError {
            line: "garbage".to_string(),
            reason: ParseErrorReason::TooFewFields { found: 1 },
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse line 'garbage': expected at least 12 fields, found 1"
        );
    }

    #[test]
    fn test_rejected_display_matches_log_format() {
        let error = SendError::Rejected {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Status code: 500, Response: Internal Server Error"
        );
    }

    #[test]
    fn test_pipeline_error_wraps_stats() {
        let error: PipelineError = StatsError::EmptyInput.into();
        assert!(matches!(error, PipelineError::Stats(StatsError::EmptyInput)));
        assert_eq!(error.to_string(), "cannot compute stats over zero records");
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::Missing("LUMU_CLIENT_KEY");
        assert_eq!(
            error.to_string(),
            "Missing required environment variable LUMU_CLIENT_KEY"
        );
    }
}
