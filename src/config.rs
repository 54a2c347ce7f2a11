use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::ChatError;

pub const DEFAULT_CONFIG_PATH: &str = "config/client.json";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const BACKEND_URL_ENV: &str = "BACKEND_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend_url: Option<String>,
    /// Email of the last successful login, offered as the default.
    #[serde(default)]
    pub email: Option<String>,
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

/// Stores the backend and email of a successful login. Never the password.
pub fn remember_login(path: &str, backend_url: &str, email: &str) {
    let mut config = load_config(path);
    config.backend_url = Some(backend_url.to_string());
    config.email = Some(email.to_string());

    if let Err(err) = save_config(path, &config) {
        log::error!("Failed to write config {}: {err}", path);
    } else {
        log::info!("Remembered login for {} in {}", email, path);
    }
}

/// Picks the backend address: CLI flag, then `BACKEND_URL`, then the config
/// file, then the local default. A trailing `/` is stripped.
pub fn resolve_backend_url(
    cli: Option<&str>,
    env: Option<&str>,
    config: &AppConfig,
) -> Result<String, ChatError> {
    let chosen = [cli, env, config.backend_url.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(DEFAULT_BACKEND_URL);

    let url = chosen.trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ChatError::Config(format!(
            "backend url must start with http:// or https://, got `{chosen}`"
        )));
    }
    Ok(url.to_string())
}

/// `http` becomes `ws` and `https` becomes `wss`.
pub fn ws_base_url(backend_url: &str) -> Result<String, ChatError> {
    if let Some(rest) = backend_url.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if let Some(rest) = backend_url.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else {
        Err(ChatError::Config(format!(
            "cannot derive a live channel address from `{backend_url}`"
        )))
    }
}
