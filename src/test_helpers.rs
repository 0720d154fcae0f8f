//! Shared builders for unit and integration tests.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::config::{AppConfig, LeaderboardConfig, NotificationConfig, SlackConfig};
use crate::models::{
    EventKind, Item, ItemSnapshot, LeaderboardSnapshot, RankedEntry, ReleaseStage, StatePayload,
    StateRecord,
};

/// A fixed reference instant, offset by `minutes`, so tests get
/// deterministic and ordered timestamps.
pub fn ts(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 20, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// Builder for [`Item`] with sensible defaults for tests.
pub struct ItemBuilder {
    item: Item,
}

impl ItemBuilder {
    /// Creates an item with the given id, defaulting to a commit at the
    /// reference instant.
    pub fn new(id: &str) -> Self {
        Self {
            item: Item {
                id: id.to_string(),
                fingerprint: id.to_string(),
                kind: EventKind::NewCommit,
                title: format!("Item {id}"),
                description: "Test item".to_string(),
                url: format!("https://example.com/{id}"),
                timestamp: ts(0),
                stage: ReleaseStage::Unknown,
                extra: serde_json::Value::Null,
            },
        }
    }

    /// Sets the event kind.
    pub fn kind(mut self, kind: EventKind) -> Self {
        self.item.kind = kind;
        self
    }

    /// Sets the upstream timestamp to the reference instant plus `minutes`.
    pub fn at(mut self, minutes: i64) -> Self {
        self.item.timestamp = ts(minutes);
        self
    }

    /// Sets the item title.
    pub fn title(mut self, title: &str) -> Self {
        self.item.title = title.to_string();
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> Item {
        self.item
    }
}

/// An item snapshot with no fingerprint or head item.
pub fn item_snapshot(items: Vec<Item>) -> ItemSnapshot {
    ItemSnapshot { items, fingerprint: None, head: None }
}

/// A previously persisted item-payload record.
pub fn items_record(entity_key: &str, seen_ids: &[&str]) -> StateRecord {
    StateRecord {
        entity_key: entity_key.to_string(),
        fingerprint: None,
        payload: StatePayload::Items {
            seen_ids: seen_ids.iter().map(|s| s.to_string()).collect(),
        },
        last_checked_at: ts(-60),
        last_changed_at: None,
    }
}

/// A ranked leaderboard entry.
pub fn ranked_entry(id: &str, rank: u32, score: f64) -> RankedEntry {
    RankedEntry {
        id: id.to_string(),
        name: id.to_uppercase(),
        rank,
        score,
        creator: Some("Test Lab".to_string()),
    }
}

/// A leaderboard snapshot for a board.
pub fn board(name: &str, entries: Vec<RankedEntry>) -> LeaderboardSnapshot {
    LeaderboardSnapshot { board: name.to_string(), entries }
}

impl AppConfig {
    /// A minimal valid configuration for tests, bypassing file loading.
    pub fn default_for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            check_interval: Duration::from_secs(3600),
            concurrency: 4,
            shutdown_timeout: Duration::from_secs(5),
            models: Vec::new(),
            priority_models: Vec::new(),
            notifications: NotificationConfig::default(),
            leaderboards: LeaderboardConfig {
                enabled: true,
                boards: HashMap::new(),
                max_rank: 10,
            },
            slack: SlackConfig::default(),
            github_token: None,
            huggingface_token: None,
            artificial_analysis_api_key: None,
        }
    }
}
