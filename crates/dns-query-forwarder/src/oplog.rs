// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The operational log: how it is written and how it is read back.
//!
//! # Format
//!
//! ```text
//! 2021-01-06 14:37:02,228 - INFO - Data send to collector API successfully
//! ```
//!
//! The same file is re-read by the log viewer, which splits each line on
//! `" - "` into date, level and message.

use serde::Serialize;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext,
};
use tracing_subscriber::registry::LookupSpan;

const SEPARATOR: &str = " - ";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Writes events as `<timestamp> - <LEVEL> - <message>`.
///
/// Span context is left out so that every line splits into exactly the three
/// sections the viewer expects.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now().format(TIMESTAMP_FORMAT);
        write!(
            &mut writer,
            "{now}{SEPARATOR}{}{SEPARATOR}",
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Opens `path` for appending, creating it and its parent directory.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpLogEntry {
    pub date: String,
    pub level: String,
    pub message: String,
}

/// Reads operational log entries in file order.
///
/// Lines that do not have all three sections are skipped. Messages may
/// themselves contain `" - "`.
pub fn read_entries<R: BufRead>(reader: R) -> io::Result<Vec<OpLogEntry>> {
    let mut entries = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut sections = line.splitn(3, SEPARATOR);
        match (sections.next(), sections.next(), sections.next()) {
            (Some(date), Some(level), Some(message)) => entries.push(OpLogEntry {
                date: date.to_string(),
                level: level.to_string(),
                message: message.to_string(),
            }),
            _ => debug!("Skipping operational log line {}: {}", number + 1, line),
        }
    }
    Ok(entries)
}

pub fn read_log_file(path: &Path) -> io::Result<Vec<OpLogEntry>> {
    read_entries(BufReader::new(File::open(path)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tracing::{error, info};

    #[test]
    fn test_read_entries() {
        let log = "2021-01-06 14:37:02,228 - INFO - Data send to collector API successfully\n\
                   2021-01-06 14:37:03,001 - ERROR - Status code: 500, Response: oops\n";
        let entries = read_entries(Cursor::new(log)).unwrap();

        assert_eq!(
            entries,
            vec![
                OpLogEntry {
                    date: "2021-01-06 14:37:02,228".to_string(),
                    level: "INFO".to_string(),
                    message: "Data send to collector API successfully".to_string(),
                },
                OpLogEntry {
                    date: "2021-01-06 14:37:03,001".to_string(),
                    level: "ERROR".to_string(),
                    message: "Status code: 500, Response: oops".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_read_entries_keeps_separator_in_message() {
        let entries =
            read_entries(Cursor::new("2021-01-06 14:37:02,228 - INFO - a - b - c")).unwrap();
        assert_eq!(entries[0].message, "a - b - c");
    }

    #[test]
    fn test_read_entries_skips_malformed_lines() {
        let log = "\n\
                   not a log line\n\
                   2021-01-06 14:37:02,228 - INFO\n\
                   2021-01-06 14:37:02,228 - INFO - kept\n";
        let entries = read_entries(Cursor::new(log)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");
    }

    #[test]
    fn test_open_log_file_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("forwarder.log");

        open_log_file(&path).unwrap();

        assert!(path.exists());
        assert!(read_log_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_formatter_output_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forwarder.log");
        let file = open_log_file(&path).unwrap();

        let subscriber = tracing_subscriber::fmt::Subscriber::builder()
            .event_format(Formatter)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            info!("Total lines to process: 3");
            error!("Exception: connection refused - retry later");
        });

        let entries = read_log_file(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, "INFO");
        assert_eq!(entries[0].message, "Total lines to process: 3");
        assert_eq!(entries[1].level, "ERROR");
        assert_eq!(
            entries[1].message,
            "Exception: connection refused - retry later"
        );
        assert!(
            chrono::NaiveDateTime::parse_from_str(&entries[0].date, TIMESTAMP_FORMAT).is_ok(),
            "unexpected timestamp {}",
            entries[0].date
        );
    }
}
