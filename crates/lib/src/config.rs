//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.troll/config.json`) and environment.
//! CLI flags are applied on top by the binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// The one contact to react to.
    #[serde(default)]
    pub target: TargetConfig,

    /// Reaction asset source.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Presence loop settings.
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Reactor options.
    #[serde(default)]
    pub reactor: ReactorConfig,

    /// Channel settings (Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// `@username`, bare username, or numeric user id.
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsConfig {
    /// Sticker set short name; the last sticker of the set is cached at startup.
    #[serde(default)]
    pub collection_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceConfig {
    /// Run the presence loop (default true).
    #[serde(default = "default_presence_enabled")]
    pub enabled: bool,

    /// Seconds between presence updates (default 120).
    #[serde(default = "default_presence_interval_secs")]
    pub interval_secs: u64,
}

fn default_presence_enabled() -> bool {
    true
}

fn default_presence_interval_secs() -> u64 {
    120
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_presence_enabled(),
            interval_secs: default_presence_interval_secs(),
        }
    }
}

impl PresenceConfig {
    /// Interval as a duration; zero is raised to one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactorConfig {
    /// When set, at most one reaction per this many seconds. Unset: every admitted message is answered.
    #[serde(default)]
    pub rate_limit_secs: Option<u64>,
}

impl ReactorConfig {
    pub fn rate_limit(&self) -> Option<Duration> {
        self.rate_limit_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Bot API base URL. Overridden by TELEGRAM_API_BASE env when set.
    pub api_base: Option<String>,
    /// Chat that receives forwarded messages before they are deleted.
    pub own_chat_id: Option<i64>,
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    non_empty_env("TELEGRAM_BOT_TOKEN")
        .or_else(|| non_empty(config.channels.telegram.bot_token.as_ref()))
}

/// Resolve the Bot API base URL: env TELEGRAM_API_BASE overrides config; None means the public endpoint.
pub fn resolve_api_base(config: &Config) -> Option<String> {
    non_empty_env("TELEGRAM_API_BASE")
        .or_else(|| non_empty(config.channels.telegram.api_base.as_ref()))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("TROLL_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".troll").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, TROLL_CONFIG_PATH, or the default. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
