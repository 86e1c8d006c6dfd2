use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Opaque participant identifier (a QQ number, an account handle, ...).
pub type SenderId = String;

/// A single chat message after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub sender_id: SenderId,
    pub nickname: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEvent {
    pub fn new(
        sender_id: impl Into<SenderId>,
        nickname: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            nickname: nickname.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Message length in characters (not bytes).
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Read-only arena of chat events shared by every pair task of a run.
///
/// Events are stably sorted by timestamp once at construction, so equal
/// timestamps keep their original stream order. A per-sender position index
/// lets a pair's merged sub-stream be built without rescanning the whole set.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    /// All events, ascending by timestamp.
    events: Vec<ChatEvent>,
    /// Positions into `events` for each sender, ascending.
    by_sender: HashMap<SenderId, Vec<usize>>,
    /// Distinct senders in first-seen stream order with their first nickname.
    participants: IndexMap<SenderId, String>,
}

impl EventStore {
    pub fn new(mut events: Vec<ChatEvent>) -> Self {
        let mut participants = IndexMap::new();
        for event in &events {
            participants
                .entry(event.sender_id.clone())
                .or_insert_with(|| event.nickname.clone());
        }

        // Vec::sort_by_key is stable.
        events.sort_by_key(|e| e.timestamp);

        let mut by_sender: HashMap<SenderId, Vec<usize>> = HashMap::new();
        for (pos, event) in events.iter().enumerate() {
            by_sender.entry(event.sender_id.clone()).or_default().push(pos);
        }

        Self {
            events,
            by_sender,
            participants,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in time order.
    pub fn events(&self) -> &[ChatEvent] {
        &self.events
    }

    /// Distinct sender ids in first-seen order, mapped to their first nickname.
    pub fn participants(&self) -> &IndexMap<SenderId, String> {
        &self.participants
    }

    pub fn contains(&self, sender_id: &str) -> bool {
        self.by_sender.contains_key(sender_id)
    }

    /// First observed nickname of a sender.
    pub fn nickname(&self, sender_id: &str) -> Option<&str> {
        self.participants.get(sender_id).map(String::as_str)
    }

    /// Number of events sent by `sender_id`.
    pub fn count_of(&self, sender_id: &str) -> usize {
        self.by_sender.get(sender_id).map_or(0, Vec::len)
    }

    /// Events sent by `sender_id`, in time order.
    pub fn events_of<'a>(&'a self, sender_id: &str) -> impl Iterator<Item = &'a ChatEvent> + 'a {
        self.by_sender
            .get(sender_id)
            .map(|positions| positions.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&pos| &self.events[pos])
    }

    /// Time-ordered merge of the events of `a` and `b`.
    ///
    /// Ties keep original stream order because positions come from the
    /// stably sorted arena.
    pub fn merged(&self, a: &str, b: &str) -> Vec<&ChatEvent> {
        let empty: &[usize] = &[];
        let left = self.by_sender.get(a).map_or(empty, Vec::as_slice);
        let right = if a == b {
            empty
        } else {
            self.by_sender.get(b).map_or(empty, Vec::as_slice)
        };

        let mut out = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            if left[i] < right[j] {
                out.push(&self.events[left[i]]);
                i += 1;
            } else {
                out.push(&self.events[right[j]]);
                j += 1;
            }
        }
        out.extend(left[i..].iter().map(|&pos| &self.events[pos]));
        out.extend(right[j..].iter().map(|&pos| &self.events[pos]));
        out
    }
}

impl From<Vec<ChatEvent>> for EventStore {
    fn from(events: Vec<ChatEvent>) -> Self {
        Self::new(events)
    }
}
