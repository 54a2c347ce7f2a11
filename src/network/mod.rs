pub mod api;
pub mod channel;
pub mod envelope;

pub use api::{ChatApi, HttpChatApi, LoginRequest, RegisterRequest};
pub use channel::{ChannelConnector, ChannelState, EnvelopeHandler, LiveChannel, WsConnector};
pub use envelope::Envelope;
