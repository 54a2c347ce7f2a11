use std::sync::Arc;

use crate::common::{ChatError, Identity, UserProfile};
use crate::config;
use crate::network::{ChannelConnector, ChatApi, HttpChatApi, WsConnector};

/// One authenticated login: profile, token-bearing API client and the
/// connector for its live channel. Built once and handed to the controller.
pub struct Session {
    profile: UserProfile,
    api: Arc<dyn ChatApi>,
    connector: Arc<dyn ChannelConnector>,
}

impl Session {
    pub fn new(
        profile: UserProfile,
        api: Arc<dyn ChatApi>,
        connector: Arc<dyn ChannelConnector>,
    ) -> Self {
        Self {
            profile,
            api,
            connector,
        }
    }

    /// Resolves the identity behind `token` with `GET /me`.
    pub async fn authenticate(backend_url: &str, token: String) -> Result<Self, ChatError> {
        let api = HttpChatApi::new(backend_url, token);
        let profile = api.me().await?;
        let ws_base = config::ws_base_url(backend_url)?;
        log::info!("Authenticated as {}", profile.id);

        Ok(Self::new(
            profile,
            Arc::new(api),
            Arc::new(WsConnector::new(ws_base)),
        ))
    }

    pub fn identity(&self) -> &Identity {
        &self.profile.id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn api(&self) -> Arc<dyn ChatApi> {
        Arc::clone(&self.api)
    }

    pub fn connector(&self) -> Arc<dyn ChannelConnector> {
        Arc::clone(&self.connector)
    }
}
