//! Frames exchanged over the live channel.
//!
//! Inbound frames are `{"type": <kind>, "data": <object>}`. Only `message`
//! carries state; every other kind is surfaced so handlers can log it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{ChatError, ChatMessage};

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Message(ChatMessage),
    /// Server acknowledged a `join_chat`.
    JoinAck { chat_id: Option<String> },
    Other { kind: String, data: Value },
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    pub fn decode(frame: &str) -> Result<Self, ChatError> {
        let raw: RawEnvelope = serde_json::from_str(frame)?;
        let envelope = match raw.kind.as_str() {
            "message" => Envelope::Message(serde_json::from_value(raw.data)?),
            "join_ack" | "joinAck" | "joined_chat" => Envelope::JoinAck {
                chat_id: raw
                    .data
                    .get("chat_id")
                    .or_else(|| raw.data.get("chatId"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            _ => Envelope::Other {
                kind: raw.kind,
                data: raw.data,
            },
        };
        Ok(envelope)
    }

    pub fn kind(&self) -> &str {
        match self {
            Envelope::Message(_) => "message",
            Envelope::JoinAck { .. } => "join_ack",
            Envelope::Other { kind, .. } => kind,
        }
    }
}

/// Frames the client sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame<'a> {
    JoinChat { chat_id: &'a str },
}

impl OutboundFrame<'_> {
    pub fn encode(&self) -> Result<String, ChatError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_message_envelope() {
        let envelope = Envelope::decode(
            r#"{"type":"message","data":{"id":"m2","chatId":"c1","senderId":"u1","content":"yo"}}"#,
        )
        .unwrap();

        match envelope {
            Envelope::Message(message) => {
                assert_eq!(message.id, "m2");
                assert_eq!(message.chat_id, "c1");
                assert_eq!(message.content, "yo");
            }
            other => panic!("unexpected envelope {other:?}"),
        }
    }

    #[test]
    fn join_ack_and_unknown_kinds_are_tagged() {
        let ack = Envelope::decode(r#"{"type":"joined_chat","data":{"chat_id":"c1"}}"#).unwrap();
        assert_eq!(
            ack,
            Envelope::JoinAck {
                chat_id: Some("c1".to_string())
            }
        );

        let typing = Envelope::decode(r#"{"type":"typing"}"#).unwrap();
        assert_eq!(typing.kind(), "typing");
    }

    #[test]
    fn malformed_frames_are_decode_errors() {
        for frame in [
            "not json",
            r#"{"data":{}}"#,
            r#"{"type":"message","data":{"id":"m1"}}"#,
        ] {
            let err = Envelope::decode(frame).unwrap_err();
            assert!(matches!(err, ChatError::Decode(_)), "{frame}: {err}");
        }
    }

    #[test]
    fn join_chat_frame_shape() {
        let json = OutboundFrame::JoinChat { chat_id: "c1" }.encode().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "join_chat");
        assert_eq!(value["chat_id"], "c1");
    }
}
