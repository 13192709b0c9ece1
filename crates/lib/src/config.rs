//! Configuration types and loading.
//!
//! Config is loaded once at startup from an optional JSON file (e.g. `~/.relay/config.json`)
//! and then overridden from the environment. The resulting `Config` is immutable and passed
//! into the constructors that need it.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const ENV_VERIFY_TOKEN: &str = "VERIFY_TOKEN";
pub const ENV_PAGE_ACCESS_TOKEN: &str = "PAGE_ACCESS_TOKEN";
pub const ENV_APP_SECRET: &str = "APP_SECRET";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_PAGE_ID: &str = "FB_PAGE_ID";
pub const ENV_PORT: &str = "PORT";

/// Top-level application config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Messenger page credentials and Graph API settings.
    #[serde(default)]
    pub messenger: MessengerConfig,

    /// Completion backend (Gemini) settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8080). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Messenger channel config. Every secret is overridden by its env var when set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessengerConfig {
    /// Token echoed back by the platform during webhook subscription (VERIFY_TOKEN).
    pub verify_token: Option<String>,
    /// Page access token used for the send API (PAGE_ACCESS_TOKEN).
    pub page_access_token: Option<String>,
    /// App secret used to verify X-Hub-Signature (APP_SECRET).
    pub app_secret: Option<String>,
    /// The bot's own page id; events sent by it are ignored (FB_PAGE_ID).
    pub page_id: Option<String>,
    /// Graph API base URL (default https://graph.facebook.com). Mostly for tests.
    pub graph_api_base: Option<String>,
}

/// Completion backend config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// Gemini API key (GEMINI_API_KEY).
    pub api_key: Option<String>,
    /// Model id, e.g. "gemini-1.5-flash-latest".
    pub model: Option<String>,
    /// Generative Language API base URL (default https://generativelanguage.googleapis.com).
    pub base_url: Option<String>,
    /// Persona prompt prepended to every user message. Defaults to the built-in persona.
    pub system_prompt: Option<String>,
    /// Reply sent when the completion call fails.
    pub fallback_reply: Option<String>,
}

/// Trim and drop empty values.
fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Env value (via `lookup`) wins over the configured value; both are trimmed and empty means unset.
fn resolve_secret(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    configured: Option<&String>,
) -> Option<String> {
    lookup(key)
        .and_then(|s| non_empty(&s))
        .or_else(|| configured.and_then(|s| non_empty(s)))
}

impl Config {
    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|k| std::env::var(k).ok());
    }

    /// Apply environment overrides using `lookup` (injectable for tests).
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let m = &mut self.messenger;
        m.verify_token = resolve_secret(&lookup, ENV_VERIFY_TOKEN, m.verify_token.as_ref());
        m.page_access_token =
            resolve_secret(&lookup, ENV_PAGE_ACCESS_TOKEN, m.page_access_token.as_ref());
        m.app_secret = resolve_secret(&lookup, ENV_APP_SECRET, m.app_secret.as_ref());
        m.page_id = resolve_secret(&lookup, ENV_PAGE_ID, m.page_id.as_ref());
        self.completion.api_key =
            resolve_secret(&lookup, ENV_GEMINI_API_KEY, self.completion.api_key.as_ref());

        if let Some(port) = lookup(ENV_PORT).and_then(|s| non_empty(&s)) {
            match port.parse::<u16>() {
                Ok(p) => self.gateway.port = p,
                Err(_) => log::warn!("ignoring invalid {} value: {:?}", ENV_PORT, port),
            }
        }
    }

    /// Names of settings that are missing; the routes depending on them fail closed.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.messenger.verify_token.is_none() {
            missing.push(ENV_VERIFY_TOKEN);
        }
        if self.messenger.page_access_token.is_none() {
            missing.push(ENV_PAGE_ACCESS_TOKEN);
        }
        if self.messenger.app_secret.is_none() {
            missing.push(ENV_APP_SECRET);
        }
        if self.completion.api_key.is_none() {
            missing.push(ENV_GEMINI_API_KEY);
        }
        if self.messenger.page_id.is_none() {
            missing.push(ENV_PAGE_ID);
        }
        missing
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".relay").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from `path` (or RELAY_CONFIG_PATH / the default path) and apply env overrides.
/// Missing file => defaults plus env. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    config.apply_env();
    Ok((config, path))
}
