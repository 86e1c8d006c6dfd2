use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as read from a source, before cleaning.
///
/// Any text field may be missing; [`crate::clean`] decides what survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub sender_id: Option<String>,
    pub nickname: Option<String>,
    pub content: Option<String>,
    pub timestamp: DateTime<Utc>,
}
