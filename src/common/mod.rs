pub mod commands;
pub mod error;
pub mod events;
pub mod types;

pub use commands::UiCommand;
pub use error::ChatError;
pub use events::ChatEvent;
pub use types::{ChatMessage, Conversation, Identity, UserProfile};
