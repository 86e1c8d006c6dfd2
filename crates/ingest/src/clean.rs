use std::collections::HashSet;
use std::sync::LazyLock;

use rapport_core::ChatEvent;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::record::RawMessage;

/// `Name(extra)` with optional whitespace around the parenthesized part.
static NAME_WITH_SUFFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*\(([^)]+)\)\s*$").ok());

/// Invisible or decorative code points removed from names and messages.
fn is_noise(c: char) -> bool {
    matches!(
        c,
        // bidi marks and embeddings
        '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}'
        // zero width space, BOM
        | '\u{200B}' | '\u{FEFF}'
        // emoji blocks
        | '\u{1F300}'..='\u{1F6FF}' | '\u{1F900}'..='\u{1F9FF}'
        // Hangul filler
        | '\u{3164}'
    )
}

/// Remove direction controls, zero-width characters, common emoji and the
/// Hangul filler from `text`.
pub fn clean_text(text: &str) -> String {
    text.chars().filter(|c| !is_noise(*c)).collect()
}

/// Drop a trailing parenthesized suffix such as an account number or mail
/// address: `"Sharen2020(2232021467)"` becomes `"Sharen2020"`.
///
/// Names without a non-blank suffix are only trimmed.
pub fn strip_id_from_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return String::new();
    }
    if let Some(re) = NAME_WITH_SUFFIX.as_ref() {
        if let Some(caps) = re.captures(name) {
            let suffix = caps.get(2).map_or("", |m| m.as_str());
            if !suffix.trim().is_empty() {
                return caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            }
        }
    }
    name.to_string()
}

/// What cleaning removed, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    pub input: usize,
    pub kept: usize,
    pub missing_sender: usize,
    pub empty_content: usize,
    pub excluded_sender: usize,
    pub blank_nickname: usize,
}

impl CleanStats {
    pub fn dropped(&self) -> usize {
        self.input - self.kept
    }
}

/// Turn raw source messages into analysis events.
///
/// Drops messages without sender or content, messages from `excluded_senders`,
/// and messages whose cleaned nickname is blank. Input order is preserved.
pub fn clean_messages(
    messages: Vec<RawMessage>,
    excluded_senders: &[String],
) -> (Vec<ChatEvent>, CleanStats) {
    let excluded: HashSet<&str> = excluded_senders.iter().map(|s| s.trim()).collect();
    let mut stats = CleanStats {
        input: messages.len(),
        ..CleanStats::default()
    };

    let mut events = Vec::with_capacity(messages.len());
    for msg in messages {
        let sender_id = match msg.sender_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                stats.missing_sender += 1;
                continue;
            }
        };

        let content = clean_text(msg.content.as_deref().unwrap_or(""));
        if content.trim().is_empty() {
            stats.empty_content += 1;
            continue;
        }

        if excluded.contains(sender_id.as_str()) {
            stats.excluded_sender += 1;
            continue;
        }

        let nickname = strip_id_from_name(&clean_text(msg.nickname.as_deref().unwrap_or("")));
        if nickname.is_empty() {
            stats.blank_nickname += 1;
            continue;
        }

        events.push(ChatEvent {
            sender_id,
            nickname,
            content,
            timestamp: msg.timestamp,
        });
    }

    stats.kept = events.len();
    debug!(?stats, "cleaning breakdown");
    info!("Cleaned {} of {} messages", stats.kept, stats.input);
    (events, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn raw(sender: Option<&str>, nickname: Option<&str>, content: Option<&str>) -> RawMessage {
        RawMessage {
            sender_id: sender.map(str::to_string),
            nickname: nickname.map(str::to_string),
            content: content.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn strips_invisible_and_emoji() {
        assert_eq!(clean_text("\u{200E}hi\u{200B} there\u{FEFF}"), "hi there");
        assert_eq!(clean_text("sun\u{1F33B}flower\u{1F980}"), "sunflower");
        assert_eq!(clean_text("\u{3164}name\u{202E}"), "name");
        assert_eq!(clean_text("你好"), "你好");
    }

    #[test]
    fn strips_parenthesized_suffix() {
        assert_eq!(strip_id_from_name("Sharen2020(2232021467)"), "Sharen2020");
        assert_eq!(strip_id_from_name("  Bob (bob@example.com) "), "Bob");
        assert_eq!(strip_id_from_name("Alice"), "Alice");
        assert_eq!(strip_id_from_name("Empty( )"), "Empty( )");
        assert_eq!(strip_id_from_name("   "), "");
    }

    #[test]
    fn drops_unusable_messages() {
        let excluded = vec!["10000".to_string()];
        let (events, stats) = clean_messages(
            vec![
                raw(Some("1"), Some("Alice(1)"), Some("hello")),
                raw(None, Some("Ghost"), Some("boo")),
                raw(Some("2"), Some("Bob"), None),
                raw(Some("3"), Some("Carol"), Some("\u{1F600}")),
                raw(Some("10000"), Some("System"), Some("joined")),
                raw(Some("4"), Some("\u{3164}"), Some("hi")),
                raw(Some(" 5 "), Some("Eve"), Some("hey")),
            ],
            &excluded,
        );

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].nickname, "Alice");
        assert_eq!(events[1].sender_id, "5");
        assert_eq!(
            stats,
            CleanStats {
                input: 7,
                kept: 2,
                missing_sender: 1,
                empty_content: 2,
                excluded_sender: 1,
                blank_nickname: 1,
            }
        );
        assert_eq!(stats.dropped(), 5);
    }
}
