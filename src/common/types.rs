use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Id of an authenticated user. Addresses the live channel and tags senders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A conversation as listed by `GET /chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, alias = "participantIds")]
    pub participant_ids: Vec<Identity>,
}

impl Conversation {
    /// First participant that is not `me`, used as the conversation title.
    pub fn counterpart(&self, me: &Identity) -> Option<&Identity> {
        self.participant_ids.iter().find(|id| *id != me)
    }
}

/// Domain model đại diện một tin nhắn chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(alias = "chatId")]
    pub chat_id: String,
    #[serde(alias = "senderId")]
    pub sender_id: Identity,
    pub content: String,
    /// Server timestamp, kept verbatim. Display only; log order is arrival order.
    #[serde(default, alias = "timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ChatMessage {
    /// `HH:MM` of `created_at`, accepting RFC 3339 and naive ISO timestamps.
    pub fn display_time(&self) -> Option<String> {
        let raw = self.created_at.as_deref()?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.format("%H:%M").to_string());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|parsed| parsed.format("%H:%M").to_string())
    }
}

/// Profile of the logged-in user as returned by `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id")]
    pub id: Identity,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_accepts_backend_and_camel_case_fields() {
        let backend: ChatMessage = serde_json::from_str(
            r#"{"_id":"m1","chat_id":"c1","sender_id":"u2","content":"hi","created_at":"2024-05-01T10:15:00.123000"}"#,
        )
        .unwrap();
        let camel: ChatMessage =
            serde_json::from_str(r#"{"id":"m1","chatId":"c1","senderId":"u2","content":"hi"}"#)
                .unwrap();

        assert_eq!(backend.id, camel.id);
        assert_eq!(backend.chat_id, "c1");
        assert_eq!(camel.sender_id, Identity::new("u2"));
        assert_eq!(backend.display_time().as_deref(), Some("10:15"));
        assert_eq!(camel.display_time(), None);
    }

    #[test]
    fn counterpart_skips_self() {
        let chat: Conversation =
            serde_json::from_str(r#"{"_id":"c1","participant_ids":["u1","u2"]}"#).unwrap();
        let me = Identity::new("u1");

        assert_eq!(chat.counterpart(&me), Some(&Identity::new("u2")));
    }

    #[test]
    fn rfc3339_timestamps_are_formatted() {
        let message = ChatMessage {
            id: "m1".to_string(),
            chat_id: "c1".to_string(),
            sender_id: Identity::new("u1"),
            content: "yo".to_string(),
            created_at: Some("2024-05-01T08:05:00Z".to_string()),
        };

        assert_eq!(message.display_time().as_deref(), Some("08:05"));
    }
}
