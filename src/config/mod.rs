//! Application configuration: the watch list, notification routing,
//! leaderboard settings and daemon tuning, loaded from a YAML file with
//! environment overrides.

mod app_config;
mod helpers;

pub use app_config::{
    AppConfig, ConfigError, LeaderboardConfig, NotificationConfig, PriorityModelConfig,
    SlackConfig, KNOWN_BOARDS,
};
pub use helpers::{deserialize_duration_from_hours, deserialize_duration_from_seconds};
