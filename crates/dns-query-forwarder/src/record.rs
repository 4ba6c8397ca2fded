// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parsing of DNS query log lines into collector events.
//!
//! Input lines follow the space-separated query log layout:
//!
//! ```text
//! 06-Jan-2021 14:37:02.228 queries: info: client @0x7f 192.168.1.5#53 (example.com): query: example.com IN A +E(0)K (10.0.0.1)
//! ```
//!
//! Only positional fields are read: date (0), time (1), client address with
//! port (6), queried host (9) and query type (11).

use crate::errors::{ParseError, ParseErrorReason};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

const MIN_FIELDS: usize = 12;
const DATE_FIELD: usize = 0;
const TIME_FIELD: usize = 1;
const CLIENT_FIELD: usize = 6;
const HOST_FIELD: usize = 9;
const TYPE_FIELD: usize = 11;

const INPUT_TIMESTAMP_FORMAT: &str = "%d-%b-%YT%H:%M:%S%.f";
const MAX_FRACTION_DIGITS: usize = 6;
const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// One DNS query as accepted by the collector API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsQueryEvent {
    /// ISO-8601 with millisecond precision and a trailing `Z`
    pub timestamp: String,
    /// Queried host
    pub name: String,
    /// Client address without its port
    pub client_ip: String,
    /// Always `None`; the log does not carry client names
    pub client_name: Option<String>,
    #[serde(rename = "type")]
    pub query_type: String,
}

/// The slice of a record kept around for top-talker stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatEntry {
    pub host: String,
    pub client_ip: String,
}

/// Parses a raw log line.
///
/// Every successful parse yields exactly one event and one stat entry.
pub fn parse_line(raw: &[u8]) -> Result<(DnsQueryEvent, StatEntry), ParseError> {
    let Ok(line) = std::str::from_utf8(raw) else {
        return Err(ParseError {
            line: String::from_utf8_lossy(raw).into_owned(),
            reason: ParseErrorReason::InvalidEncoding,
        });
    };
    let line = line.trim_end_matches(['\r', '\n']);
    let fail = |reason| ParseError {
        line: line.to_string(),
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(fail(ParseErrorReason::TooFewFields {
            found: fields.len(),
        }));
    }

    let timestamp = normalize_timestamp(fields[DATE_FIELD], fields[TIME_FIELD])
        .ok_or_else(|| {
            fail(ParseErrorReason::InvalidTimestamp(format!(
                "{} {}",
                fields[DATE_FIELD], fields[TIME_FIELD]
            )))
        })?;
    let client_ip = strip_port(fields[CLIENT_FIELD])
        .ok_or_else(|| fail(ParseErrorReason::MalformedAddress(fields[CLIENT_FIELD].to_string())))?;
    let host = fields[HOST_FIELD].to_string();

    let event = DnsQueryEvent {
        timestamp,
        name: host.clone(),
        client_ip: client_ip.clone(),
        client_name: None,
        query_type: fields[TYPE_FIELD].to_string(),
    };
    Ok((event, StatEntry { host, client_ip }))
}

/// `06-Jan-2021` + `14:37:02.228` -> `2021-01-06T14:37:02.228Z`
fn normalize_timestamp(date: &str, time: &str) -> Option<String> {
    // chrono's %.f treats the fraction as optional and takes up to 9 digits
    let (_, fraction) = time.split_once('.')?;
    if fraction.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let combined = format!("{date}T{time}");
    let parsed = NaiveDateTime::parse_from_str(&combined, INPUT_TIMESTAMP_FORMAT).ok()?;
    Some(parsed.format(OUTPUT_TIMESTAMP_FORMAT).to_string())
}

/// `192.168.1.5#53` -> `192.168.1.5`
fn strip_port(field: &str) -> Option<String> {
    let address = field.split('#').next()?;
    address.parse::<IpAddr>().ok()?;
    Some(address.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LINE: &str = "06-Jan-2021 14:37:02.228 queries: info: client @0x55adcc672cc0 192.168.1.5#53 (example.com): query: example.com IN A +E(0)K (10.0.0.1)";

    #[test]
    fn test_parse_line() {
        let (event, stat) = parse_line(LINE.as_bytes()).unwrap();

        assert_eq!(event.timestamp, "2021-01-06T14:37:02.228Z");
        assert_eq!(event.name, "example.com");
        assert_eq!(event.client_ip, "192.168.1.5");
        assert_eq!(event.client_name, None);
        assert_eq!(event.query_type, "A");
        assert_eq!(
            stat,
            StatEntry {
                host: "example.com".to_string(),
                client_ip: "192.168.1.5".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_line_trailing_newline() {
        let with_newline = format!("{LINE}\r\n");
        assert_eq!(
            parse_line(with_newline.as_bytes()),
            parse_line(LINE.as_bytes())
        );
    }

    #[test]
    fn test_parse_line_ipv6_client() {
        let line = LINE.replace("192.168.1.5#53", "2001:db8::1#5353");
        let (event, _) = parse_line(line.as_bytes()).unwrap();
        assert_eq!(event.client_ip, "2001:db8::1");
    }

    #[test]
    fn test_timestamp_requires_fraction() {
        for time in ["14:37:02", "14:37:02.", "14:37:02.123456789", "14:37:02.12a"] {
            let line = LINE.replace("14:37:02.228", time);
            let err = parse_line(line.as_bytes()).unwrap_err();
            assert_eq!(
                err.reason,
                ParseErrorReason::InvalidTimestamp(format!("06-Jan-2021 {time}"))
            );
        }
    }

    #[test]
    fn test_timestamp_single_digit_fraction() {
        let line = LINE.replace("14:37:02.228", "14:37:02.5");
        let (event, _) = parse_line(line.as_bytes()).unwrap();
        assert_eq!(event.timestamp, "2021-01-06T14:37:02.500Z");
    }

    #[test]
    fn test_timestamp_truncates_to_millis() {
        let line = LINE.replace("14:37:02.228", "14:37:02.228999");
        let (event, _) = parse_line(line.as_bytes()).unwrap();
        assert_eq!(event.timestamp, "2021-01-06T14:37:02.228Z");
    }

    #[test]
    fn test_event_serialization() {
        let (event, _) = parse_line(LINE.as_bytes()).unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "timestamp": "2021-01-06T14:37:02.228Z",
                "name": "example.com",
                "client_ip": "192.168.1.5",
                "client_name": null,
                "type": "A"
            })
        );
    }

    #[test]
    fn test_too_few_fields() {
        let err = parse_line(b"06-Jan-2021 14:37:02.228 queries: info:").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::TooFewFields { found: 4 });
        assert_eq!(err.line, "06-Jan-2021 14:37:02.228 queries: info:");
    }

    #[test]
    fn test_invalid_timestamp() {
        let line = LINE.replace("06-Jan-2021", "06-Foo-2021");
        let err = parse_line(line.as_bytes()).unwrap_err();
        assert_eq!(
            err.reason,
            ParseErrorReason::InvalidTimestamp("06-Foo-2021 14:37:02.228".to_string())
        );
        assert_eq!(err.line, line);
    }

    #[test]
    fn test_malformed_address() {
        for bad in ["#53", "not-an-ip#53", "192.168.1#53"] {
            let line = LINE.replace("192.168.1.5#53", bad);
            let err = parse_line(line.as_bytes()).unwrap_err();
            assert_eq!(err.reason, ParseErrorReason::MalformedAddress(bad.to_string()));
        }
    }

    #[test]
    fn test_invalid_encoding() {
        let mut raw = LINE.as_bytes().to_vec();
        raw[30] = 0xff;
        let err = parse_line(&raw).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::InvalidEncoding);
    }

    proptest! {
        #[test]
        fn parse_is_pure(line in ".*") {
            prop_assert_eq!(parse_line(line.as_bytes()), parse_line(line.as_bytes()));
        }

        #[test]
        fn parse_keeps_event_and_stat_aligned(
            host in "[a-z]{1,12}\\.(com|net|org)",
            octet in 0u8..=255,
            port in 1u16..,
        ) {
            let line = LINE
                .replace("192.168.1.5#53", &format!("10.0.0.{octet}#{port}"))
                .replace("example.com", &host);
            let (event, stat) = parse_line(line.as_bytes()).unwrap();
            prop_assert_eq!(&event.name, &stat.host);
            prop_assert_eq!(&event.client_ip, &stat.client_ip);
            prop_assert_eq!(event.client_ip, format!("10.0.0.{octet}"));
        }
    }
}
