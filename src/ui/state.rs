use chrono::{DateTime, Utc};

use crate::common::ChatEvent;
use crate::network::ChannelState;

const MAX_DEBUG_EVENTS: usize = 100;

/// Debug event để hiển thị thông tin phiên chat
#[derive(Debug, Clone)]
pub struct DebugEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: &'static str,
    pub message: String,
}

/// Trạng thái cục bộ của UI. Conversations and messages live in the store.
pub struct AppState {
    pub input_text: String,
    /// Last error reported by the controller, shown until the next success.
    pub status: Option<String>,
    pub live_state: Option<ChannelState>,
    pub live_error: Option<String>,
    pub debug_events: Vec<DebugEvent>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            input_text: String::new(),
            status: None,
            live_state: None,
            live_error: None,
            debug_events: Vec::new(),
        }
    }

    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::ConversationsLoaded(count) => {
                self.status = None;
                self.add_debug_event("CONVERSATIONS", format!("Loaded {count} conversations"));
            }
            ChatEvent::ActiveConversationChanged { chat_id, messages } => {
                self.status = None;
                self.add_debug_event(
                    "CHAT_OPENED",
                    format!("Opened {chat_id} with {messages} messages"),
                );
            }
            ChatEvent::MessageAppended {
                chat_id,
                message_id,
            } => {
                self.add_debug_event("MESSAGE_RECEIVED", format!("{message_id} in {chat_id}"));
            }
            ChatEvent::MessageSent { chat_id } => {
                self.status = None;
                self.add_debug_event("MESSAGE_SENT", format!("Sent to {chat_id}"));
            }
            ChatEvent::LiveChannel(state) => {
                self.live_state = Some(state);
                self.add_debug_event("LIVE_CHANNEL", format!("Live channel {state:?}"));
            }
            ChatEvent::LiveUpdatesUnavailable(reason) => {
                self.add_debug_event("LIVE_UNAVAILABLE", reason.clone());
                self.live_error = Some(reason);
            }
            ChatEvent::Error(message) => {
                self.add_debug_event("ERROR", message.clone());
                self.status = Some(message);
            }
        }
    }

    pub fn add_debug_event(&mut self, event_type: &'static str, message: String) {
        self.debug_events.push(DebugEvent {
            timestamp: Utc::now(),
            event_type,
            message,
        });

        // Giữ tối đa 100 events để không chiếm quá nhiều bộ nhớ
        if self.debug_events.len() > MAX_DEBUG_EVENTS {
            self.debug_events.remove(0);
        }
    }
}
