use crate::api::models::{ChatMessage, MessageType};
use chrono::TimeZone;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatBubble {
    pub id: String,
    pub text: String,
    pub outgoing: bool,
    pub time: String,
    pub read: bool,
}

pub fn bubbles<Tz: TimeZone>(messages: &[ChatMessage], viewer_id: &str, tz: &Tz) -> Vec<ChatBubble>
where
    Tz::Offset: std::fmt::Display,
{
    messages
        .iter()
        .map(|m| {
            let text = match m.message_type {
                MessageType::Image => format!("[image] {}", m.content),
                MessageType::File => format!("[file] {}", m.content),
                MessageType::Text | MessageType::System => m.content.clone(),
            };
            ChatBubble {
                id: m.id.clone(),
                text,
                outgoing: m.sender_id == viewer_id,
                time: m.created_at.with_timezone(tz).format("%H:%M").to_string(),
                read: m.is_read,
            }
        })
        .collect()
}

/// Trimmed text to send, or `None` when there is nothing to send.
pub fn compose(input: &str) -> Option<String> {
    let text = input.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// Ids of messages from the other party the viewer has not read yet.
pub fn unread_incoming_ids<'a>(messages: &'a [ChatMessage], viewer_id: &str) -> Vec<&'a str> {
    messages
        .iter()
        .filter(|m| !m.is_read && m.sender_id != viewer_id)
        .map(|m| m.id.as_str())
        .collect()
}

/// Whether opening the chat has anything for the viewer to mark read.
pub fn has_unread_incoming(messages: &[ChatMessage], viewer_id: &str) -> bool {
    !unread_incoming_ids(messages, viewer_id).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::SenderType;
    use chrono::Utc;

    fn msg(id: &str, sender: &str, read: bool, kind: MessageType) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            conversation_id: "c1".into(),
            sender_id: sender.into(),
            sender_type: if sender.starts_with("coach") { SenderType::Coach } else { SenderType::Client },
            message_type: kind,
            content: "hello".into(),
            is_read: read,
            created_at: "2025-01-31T08:05:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn aligns_by_sender() {
        let msgs = [
            msg("m1", "coach-1", true, MessageType::Text),
            msg("m2", "client-9", false, MessageType::Image),
        ];
        let out = bubbles(&msgs, "coach-1", &Utc);
        assert!(out[0].outgoing);
        assert!(!out[1].outgoing);
        assert_eq!(out[1].text, "[image] hello");
        assert_eq!(out[0].time, "08:05");
        assert!(has_unread_incoming(&msgs, "coach-1"));
        assert!(!has_unread_incoming(&msgs, "client-9"));
    }

    #[test]
    fn only_unread_messages_from_the_other_party_are_listed() {
        let msgs = [
            msg("m1", "client-9", false, MessageType::Text),
            msg("m2", "coach-1", false, MessageType::Text),
            msg("m3", "client-9", true, MessageType::Text),
            msg("m4", "client-9", false, MessageType::File),
        ];
        assert_eq!(unread_incoming_ids(&msgs, "coach-1"), vec!["m1", "m4"]);
        assert_eq!(unread_incoming_ids(&msgs, "client-9"), vec!["m2"]);
    }

    #[test]
    fn blank_input_is_not_sent() {
        assert_eq!(compose("   \n"), None);
        assert_eq!(compose("  on my way "), Some("on my way".to_string()));
    }
}
