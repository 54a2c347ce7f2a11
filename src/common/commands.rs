use super::types::Conversation;

/// Lệnh UI gửi xuống controller.
#[derive(Debug, Clone)]
pub enum UiCommand {
    /// Make `Conversation` the active one (history fetch + join).
    SelectConversation(Conversation),
    SendMessage(String),
    RefreshConversations,
}
