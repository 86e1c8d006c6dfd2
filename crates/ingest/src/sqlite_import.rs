use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use rapport_core::{RapportError, RapportResult};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::record::RawMessage;

/// Text messages of one group from a QQ NT message database.
///
/// Column names are the numeric tags of `group_msg_table`: group `40027`,
/// sender `40033`, group nickname `40090`, account name `40093`, send time
/// `40050` (unix seconds), content `40080`. `40011 = 2 AND 40012 = 1` selects
/// plain text messages.
const GROUP_TEXT_QUERY: &str = r#"
    SELECT "40033", "40090", "40093", "40080", "40050"
    FROM group_msg_table
    WHERE "40027" = ?1
      AND "40011" = 2
      AND "40012" = 1
      AND "40080" IS NOT NULL
      AND TRIM("40080") <> ''
"#;

pub struct SqliteImporter;

impl SqliteImporter {
    /// Read every text message of `group_id`, oldest rows first as stored.
    pub fn import(path: &Path, group_id: &str) -> RapportResult<Vec<RawMessage>> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| RapportError::Database(format!("{}: {}", path.display(), e)))?;
        let messages = Self::import_from(&conn, group_id)?;
        info!(
            "Imported {} messages of group {} from {}",
            messages.len(),
            group_id,
            path.display()
        );
        Ok(messages)
    }

    pub fn import_from(conn: &Connection, group_id: &str) -> RapportResult<Vec<RawMessage>> {
        let group_id = group_id.trim();
        // Group ids are stored as integers; fall back to text for other layouts.
        let group_param = match group_id.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Text(group_id.to_string()),
        };

        let mut stmt = conn
            .prepare(GROUP_TEXT_QUERY)
            .map_err(|e| RapportError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![group_param], |row| {
                Ok((
                    text_of(row.get_ref(0)?),
                    text_of(row.get_ref(1)?),
                    text_of(row.get_ref(2)?),
                    text_of(row.get_ref(3)?),
                    seconds_of(row.get_ref(4)?),
                ))
            })
            .map_err(|e| RapportError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RapportError::Database(e.to_string()))?;

        let total = rows.len();
        let mut messages = Vec::with_capacity(total);
        for (sender_id, group_nickname, account_name, content, secs) in rows {
            let Some(timestamp) = secs.and_then(unix_seconds) else {
                warn!("Skipping message from {:?}: unreadable send time", sender_id);
                continue;
            };
            let nickname = group_nickname
                .filter(|name| !name.trim().is_empty())
                .or(account_name);
            messages.push(RawMessage {
                sender_id,
                nickname,
                content,
                timestamp,
            });
        }

        debug!(total, kept = messages.len(), "sqlite rows read");
        Ok(messages)
    }
}

fn text_of(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn seconds_of(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(n) => Some(n),
        ValueRef::Real(f) if f.is_finite() => Some(f as i64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        _ => None,
    }
}

fn unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
