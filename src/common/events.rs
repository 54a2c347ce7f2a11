use crate::network::ChannelState;

/// Sự kiện từ controller gửi lên UI.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    ConversationsLoaded(usize),
    ActiveConversationChanged { chat_id: String, messages: usize },
    MessageAppended { chat_id: String, message_id: String },
    MessageSent { chat_id: String },
    LiveChannel(ChannelState),
    /// Live updates are off; history browsing still works.
    LiveUpdatesUnavailable(String),
    Error(String),
}
