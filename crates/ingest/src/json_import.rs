use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rapport_core::{RapportError, RapportResult};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::record::RawMessage;

/// Reads chat exports shaped as a JSON array of records or as JSON lines.
///
/// Each record carries `sender_id`, `nickname`, `content` and `timestamp`.
/// Records whose timestamp cannot be read are skipped with a warning.
pub struct JsonImporter;

impl JsonImporter {
    pub fn import(path: &Path) -> RapportResult<Vec<RawMessage>> {
        let text = std::fs::read_to_string(path)?;
        let messages = Self::parse(&text)?;
        info!("Imported {} messages from {}", messages.len(), path.display());
        Ok(messages)
    }

    /// Parse an already loaded export.
    pub fn parse(text: &str) -> RapportResult<Vec<RawMessage>> {
        let records: Vec<Value> = if text.trim_start().starts_with('[') {
            serde_json::from_str(text)?
        } else {
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .map(serde_json::from_str)
                .collect::<Result<_, _>>()?
        };

        let total = records.len();
        let mut messages = Vec::with_capacity(total);
        for (idx, record) in records.iter().enumerate() {
            match parse_record(record) {
                Ok(msg) => messages.push(msg),
                Err(e) => warn!("Skipping record {}: {}", idx, e),
            }
        }

        debug!(total, kept = messages.len(), "json records parsed");
        Ok(messages)
    }
}

fn parse_record(record: &Value) -> RapportResult<RawMessage> {
    let Value::Object(fields) = record else {
        return Err(RapportError::Other(format!("expected an object, got {}", record)));
    };

    let timestamp = fields
        .get("timestamp")
        .ok_or_else(|| RapportError::InvalidTimestamp("missing".to_string()))
        .and_then(parse_timestamp)?;

    Ok(RawMessage {
        sender_id: fields.get("sender_id").and_then(scalar_text),
        nickname: fields.get("nickname").and_then(scalar_text),
        content: fields.get("content").and_then(scalar_text),
        timestamp,
    })
}

/// Strings as-is, numbers in their decimal form; anything else is absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Unix seconds (integer or fractional), or an RFC 3339 / `YYYY-MM-DD HH:MM:SS`
/// string taken as UTC.
pub fn parse_timestamp(value: &Value) -> RapportResult<DateTime<Utc>> {
    let invalid = || RapportError::InvalidTimestamp(value.to_string());
    match value {
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                return Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid);
            }
            let secs = n.as_f64().filter(|s| s.is_finite()).ok_or_else(invalid)?;
            let micros = (secs * 1_000_000.0).round();
            if micros.abs() >= i64::MAX as f64 {
                return Err(invalid());
            }
            DateTime::from_timestamp_micros(micros as i64).ok_or_else(invalid)
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Ok(ts.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Ok(naive.and_utc());
            }
            if let Ok(secs) = s.parse::<i64>() {
                return Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid);
            }
            Err(invalid())
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_array_with_mixed_id_types() {
        let text = r#"[
            {"sender_id": 123, "nickname": "A", "content": "hi", "timestamp": 1700000000},
            {"sender_id": "456", "nickname": "B", "content": "yo", "timestamp": "2023-11-14T22:13:30Z"}
        ]"#;
        let messages = JsonImporter::parse(text).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender_id.as_deref(), Some("123"));
        assert_eq!(messages[1].sender_id.as_deref(), Some("456"));
        assert_eq!(messages[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(messages[1].timestamp.timestamp(), 1_700_000_010);
    }

    #[test]
    fn parses_json_lines_and_skips_bad_timestamps() {
        let text = "\
{\"sender_id\": \"1\", \"nickname\": \"A\", \"content\": \"a\", \"timestamp\": 10}

{\"sender_id\": \"2\", \"nickname\": \"B\", \"content\": \"b\", \"timestamp\": \"yesterday\"}
{\"sender_id\": \"3\", \"nickname\": \"C\", \"content\": \"c\"}
{\"sender_id\": \"4\", \"nickname\": null, \"content\": \"d\", \"timestamp\": 12.5}
";
        let messages = JsonImporter::parse(text).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender_id.as_deref(), Some("1"));
        assert_eq!(messages[1].nickname, None);
        assert_eq!(messages[1].timestamp.timestamp_micros(), 12_500_000);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(JsonImporter::parse("[{\"sender_id\": ").is_err());
        assert!(JsonImporter::parse("not json at all").is_err());
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(
            parse_timestamp(&json!("2024-01-02 03:04:05")).unwrap().to_rfc3339(),
            "2024-01-02T03:04:05+00:00"
        );
        assert_eq!(
            parse_timestamp(&json!("2024-01-02T03:04:05+08:00")).unwrap().timestamp(),
            parse_timestamp(&json!("2024-01-01 19:04:05")).unwrap().timestamp()
        );
        assert_eq!(parse_timestamp(&json!("60")).unwrap().timestamp(), 60);
        assert!(parse_timestamp(&json!(true)).is_err());
        assert!(parse_timestamp(&json!(1e300)).is_err());
    }
}
