use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The live channel could not be established, is closed, or dropped.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Non-success status, transport failure or unreadable body on an HTTP call.
    #[error("Request {endpoint} failed{}: {detail}", .status.map(|code| format!(" ({code})")).unwrap_or_default())]
    Fetch {
        endpoint: String,
        status: Option<u16>,
        detail: String,
    },

    #[error("Malformed envelope: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No active conversation selected")]
    NoActiveConversation,

    #[error("Message content is empty")]
    EmptyMessage,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    pub fn fetch(
        endpoint: impl Into<String>,
        status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Fetch {
            endpoint: endpoint.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}
