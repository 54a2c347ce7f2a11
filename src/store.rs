use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::common::{ChatMessage, Conversation};

/// Store shared between controller tasks and the UI thread.
pub type SharedStore = Arc<Mutex<ConversationStore>>;

pub fn shared() -> SharedStore {
    Arc::new(Mutex::new(ConversationStore::default()))
}

/// Never held across an await.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, ConversationStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Conversation list plus the message log of the active conversation.
///
/// The log holds the last history fetched for the active chat followed by the
/// live messages received for it since, in arrival order, without duplicate
/// ids. Callers are trusted to set the history before routing live messages.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_chat_id: Option<String>,
    log: Vec<ChatMessage>,
    seen_ids: HashSet<String>,
}

impl ConversationStore {
    /// Replaces the list wholesale. The active log is left alone.
    pub fn set_conversations(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
    }

    pub fn set_active_history(&mut self, chat_id: &str, history: Vec<ChatMessage>) {
        self.active_chat_id = Some(chat_id.to_string());
        self.log.clear();
        self.seen_ids.clear();

        for message in history {
            if message.chat_id != chat_id {
                log::debug!(
                    "History for {chat_id} contained message {} of chat {}; skipped",
                    message.id,
                    message.chat_id
                );
                continue;
            }
            if self.seen_ids.insert(message.id.clone()) {
                self.log.push(message);
            }
        }
    }

    /// Appends when `message` belongs to the active chat and is not yet in the
    /// log. Returns whether the log changed.
    pub fn append_live_message(&mut self, message: ChatMessage) -> bool {
        if self.active_chat_id.as_deref() != Some(message.chat_id.as_str()) {
            return false;
        }
        if !self.seen_ids.insert(message.id.clone()) {
            return false;
        }
        self.log.push(message);
        true
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_chat_id(&self) -> Option<&str> {
        self.active_chat_id.as_deref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        let active = self.active_chat_id.as_deref()?;
        self.conversations.iter().find(|chat| chat.id == active)
    }

    pub fn active_log(&self) -> &[ChatMessage] {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Identity;

    fn message(id: &str, chat_id: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            chat_id: chat_id.to_string(),
            sender_id: Identity::new("u2"),
            content: format!("content of {id}"),
            created_at: None,
        }
    }

    fn ids(store: &ConversationStore) -> Vec<&str> {
        store.active_log().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn live_messages_for_other_chats_are_ignored() {
        let mut store = ConversationStore::default();
        store.set_active_history("c1", vec![message("m1", "c1")]);

        assert!(!store.append_live_message(message("m9", "c2")));
        assert_eq!(ids(&store), ["m1"]);
    }

    #[test]
    fn nothing_is_appended_before_a_chat_is_active() {
        let mut store = ConversationStore::default();

        assert!(!store.append_live_message(message("m1", "c1")));
        assert!(store.active_log().is_empty());
    }

    #[test]
    fn duplicate_ids_are_appended_once() {
        let mut store = ConversationStore::default();
        store.set_active_history("c1", vec![message("m1", "c1")]);

        assert!(store.append_live_message(message("m2", "c1")));
        assert!(!store.append_live_message(message("m2", "c1")));
        assert!(!store.append_live_message(message("m1", "c1")));
        assert_eq!(ids(&store), ["m1", "m2"]);
    }

    #[test]
    fn history_replaces_log_and_drops_foreign_or_repeated_entries() {
        let mut store = ConversationStore::default();
        store.set_active_history("c1", vec![message("m1", "c1")]);
        store.append_live_message(message("m2", "c1"));

        store.set_active_history(
            "c2",
            vec![
                message("n1", "c2"),
                message("x1", "c1"),
                message("n2", "c2"),
                message("n1", "c2"),
            ],
        );

        assert_eq!(store.active_chat_id(), Some("c2"));
        assert_eq!(ids(&store), ["n1", "n2"]);
        // ids from the previous chat no longer count as seen
        store.set_active_history("c1", Vec::new());
        assert!(store.append_live_message(message("m2", "c1")));
    }

    #[test]
    fn refreshing_conversations_keeps_the_active_log() {
        let mut store = ConversationStore::default();
        let chat = Conversation {
            id: "c1".to_string(),
            participant_ids: vec![Identity::new("u1"), Identity::new("u2")],
        };
        store.set_conversations(vec![chat.clone()]);
        store.set_active_history("c1", vec![message("m1", "c1")]);

        store.set_conversations(vec![chat.clone()]);

        assert_eq!(store.conversations(), [chat.clone()]);
        assert_eq!(store.active_conversation(), Some(&chat));
        assert_eq!(ids(&store), ["m1"]);
    }
}
