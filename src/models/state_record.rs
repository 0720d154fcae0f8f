//! The persisted last-known state per entity/source pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::LeaderboardSnapshot;

/// Payload stored alongside a state record: whatever the diff engine needs
/// to compute the next diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatePayload {
    /// Identifiers already reported for an item-set source.
    Items {
        /// Seen item ids, oldest first, bounded by the diff engine.
        seen_ids: Vec<String>,
    },
    /// The full previous ranked list for a leaderboard board.
    Ranked(LeaderboardSnapshot),
}

impl StatePayload {
    /// Seen ids, when this is an item payload.
    pub fn seen_ids(&self) -> Option<&[String]> {
        match self {
            StatePayload::Items { seen_ids } => Some(seen_ids),
            StatePayload::Ranked(_) => None,
        }
    }

    /// The previous leaderboard snapshot, when this is a ranked payload.
    pub fn ranked(&self) -> Option<&LeaderboardSnapshot> {
        match self {
            StatePayload::Ranked(snapshot) => Some(snapshot),
            StatePayload::Items { .. } => None,
        }
    }
}

/// Durable record of the last observed state for one `(entity, source)`
/// pair. At most one record exists per key; absence means the pair has never
/// been observed, which is distinct from "observed but unchanged".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Stable key combining entity name and source kind, e.g.
    /// `github:Z-Image`.
    pub entity_key: String,

    /// Opaque marker of the last-seen state (latest commit SHA, model
    /// revision timestamp). Advances only when an event was emitted.
    pub fingerprint: Option<String>,

    /// Structured payload needed to compute future diffs.
    pub payload: StatePayload,

    /// When the pair was last polled, successful diff or not.
    pub last_checked_at: DateTime<Utc>,

    /// When an event was last emitted for the pair.
    pub last_changed_at: Option<DateTime<Utc>>,
}
