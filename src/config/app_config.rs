//! Top-level application configuration.

use std::{
    collections::HashMap,
    path::Path,
    time::Duration,
};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use super::helpers::{deserialize_duration_from_hours, deserialize_duration_from_seconds};
use crate::models::{EventKind, WatchedEntity};

/// Board names the leaderboard API exposes, in the order they are polled.
pub const KNOWN_BOARDS: [&str; 5] = [
    "text-to-image",
    "image-editing",
    "text-to-video",
    "image-to-video",
    "text-to-speech",
];

/// Errors raised while loading or validating configuration. These are fatal
/// at startup and surfaced to the operator; they are never recovered from.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The configuration parsed but describes an invalid watch list or
    /// routing table.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_database_url() -> String {
    "sqlite://data/watcher_state.db".to_string()
}

fn default_check_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_concurrency() -> usize {
    8
}

fn default_max_rank() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_mention_channel_for() -> Vec<EventKind> {
    vec![EventKind::NewRelease, EventKind::NewModel, EventKind::RepoCreated]
}

fn default_boards() -> HashMap<String, bool> {
    KNOWN_BOARDS.iter().map(|b| (b.to_string(), true)).collect()
}

/// Notification routing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Whether to prefix notifications with a per-source icon.
    #[serde(default = "default_true")]
    pub include_icons: bool,

    /// Whether to append the detection timestamp to notifications.
    #[serde(default = "default_true")]
    pub include_timestamp: bool,

    /// Event kinds that mention `@channel` in addition to the normal
    /// notification.
    #[serde(default = "default_mention_channel_for")]
    pub mention_channel_for: Vec<EventKind>,

    /// Maps an event kind to a named channel. Kinds not listed here go to
    /// the catch-all default channel.
    #[serde(default)]
    pub event_routing: HashMap<EventKind, String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            include_icons: true,
            include_timestamp: true,
            mention_channel_for: default_mention_channel_for(),
            event_routing: HashMap::new(),
        }
    }
}

/// Per-model override that forces channel mentions for every change of a
/// priority model.
#[derive(Debug, Clone, Deserialize)]
pub struct PriorityModelConfig {
    /// Entity name, matched case-insensitively against the watch list.
    pub name: String,

    /// Whether events for this model mention `@channel`.
    #[serde(default = "default_true")]
    pub mention_channel: bool,
}

/// Leaderboard monitoring settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardConfig {
    /// Master switch for leaderboard watching.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-board enable flags, keyed by board name.
    #[serde(default = "default_boards")]
    pub boards: HashMap<String, bool>,

    /// Truncation boundary: entries ranked below this are not tracked.
    #[serde(default = "default_max_rank")]
    pub max_rank: u32,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self { enabled: true, boards: default_boards(), max_rank: default_max_rank() }
    }
}

impl LeaderboardConfig {
    /// Enabled board names in the canonical polling order.
    pub fn enabled_boards(&self) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        KNOWN_BOARDS
            .iter()
            .filter(|board| self.boards.get(**board).copied().unwrap_or(false))
            .map(|board| board.to_string())
            .collect()
    }
}

/// Slack delivery settings. Webhook URLs can also come from the environment
/// (`SLACK_WEBHOOK_URL`), which takes precedence over the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackConfig {
    /// Default (catch-all) incoming webhook URL.
    #[serde(default)]
    pub webhook_url: String,

    /// Named channel webhooks used by `event_routing` targets.
    #[serde(default)]
    pub channels: HashMap<String, String>,
}

/// Application configuration for the watcher daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database URL for the SQLite state store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// The interval between poll sweeps.
    #[serde(
        rename = "check_interval_hours",
        deserialize_with = "deserialize_duration_from_hours",
        default = "default_check_interval"
    )]
    pub check_interval: Duration,

    /// Maximum number of entity/source pairs polled concurrently within one
    /// sweep.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// The maximum time to wait for graceful shutdown.
    #[serde(
        rename = "shutdown_timeout_secs",
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// The watch list.
    #[serde(default)]
    pub models: Vec<WatchedEntity>,

    /// Priority model overrides.
    #[serde(default)]
    pub priority_models: Vec<PriorityModelConfig>,

    /// Notification routing settings.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Leaderboard monitoring settings.
    #[serde(default)]
    pub leaderboards: LeaderboardConfig,

    /// Slack delivery settings.
    #[serde(default)]
    pub slack: SlackConfig,

    /// GitHub API token. Environment only (`GITHUB_TOKEN`).
    #[serde(skip_deserializing)]
    pub github_token: Option<String>,

    /// Hugging Face API token. Environment only (`HF_TOKEN`).
    #[serde(skip_deserializing)]
    pub huggingface_token: Option<String>,

    /// Artificial Analysis API key. Environment only
    /// (`ARTIFICIAL_ANALYSIS_API_KEY`).
    #[serde(skip_deserializing)]
    pub artificial_analysis_api_key: Option<String>,
}

impl AppConfig {
    /// Loads configuration from the given YAML file, applies environment
    /// overrides (prefix `MODELWATCH__`, plus the well-known token
    /// variables) and validates the result.
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| "config.yaml".into());

        let builder = Config::builder()
            .add_source(File::from(path.as_path()))
            .add_source(Environment::with_prefix("MODELWATCH").separator("__"))
            .build()?;

        let mut config: AppConfig = builder.try_deserialize()?;

        // API credentials are environment-only so they never end up in a
        // checked-in config file.
        config.github_token = std::env::var("GITHUB_TOKEN").ok();
        config.huggingface_token = std::env::var("HF_TOKEN").ok();
        config.artificial_analysis_api_key = std::env::var("ARTIFICIAL_ANALYSIS_API_KEY").ok();
        if let Ok(url) = std::env::var("SLACK_WEBHOOK_URL") {
            config.slack.webhook_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the watch list and routing tables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_names = std::collections::HashSet::new();
        for model in &self.models {
            if model.name.trim().is_empty() {
                return Err(ConfigError::Invalid("model with empty name".to_string()));
            }
            if !seen_names.insert(model.name.to_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate model name '{}'",
                    model.name
                )));
            }
            if !model.has_sources() {
                return Err(ConfigError::Invalid(format!(
                    "model '{}' has no sources configured",
                    model.name
                )));
            }
        }

        for board in self.leaderboards.boards.keys() {
            if !KNOWN_BOARDS.contains(&board.as_str()) {
                return Err(ConfigError::Invalid(format!("unknown leaderboard board '{board}'")));
            }
        }

        if self.check_interval.is_zero() {
            return Err(ConfigError::Invalid("check_interval_hours must be positive".to_string()));
        }

        Ok(())
    }

    /// Whether the named entity is configured as priority, either through
    /// its tier or a `priority_models` override.
    pub fn is_priority_model(&self, name: &str) -> bool {
        self.priority_config(name).is_some()
            || self
                .models
                .iter()
                .any(|m| m.name.eq_ignore_ascii_case(name) && m.is_high_priority())
    }

    /// The priority override for an entity, if one exists.
    pub fn priority_config(&self, name: &str) -> Option<&PriorityModelConfig> {
        self.priority_models.iter().find(|pm| pm.name.eq_ignore_ascii_case(name))
    }
}
