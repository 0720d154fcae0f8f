//! Classified events produced by the diff engines.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::{Item, SourceKind};

/// The semantic kind of a detected change.
///
/// Serialized names (snake_case) are what configuration files use in
/// `event_routing` and `mention_channel_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A watched repository was observed for the first time.
    RepoCreated,
    /// A new commit (or hub revision) appeared.
    NewCommit,
    /// A new release or tag was published.
    NewRelease,
    /// A watched model appeared on a hub.
    NewModel,
    /// An existing model's revision pointer moved without new items.
    ModelUpdate,
    /// A new paper matched the configured query.
    NewPaper,
    /// A news article matched the configured keywords.
    NewsArticle,
    /// A model entered the tracked leaderboard window.
    LeaderboardNewEntry,
    /// A tracked model's rank moved.
    LeaderboardRankChange,
    /// The membership of the leaderboard top 3 changed.
    LeaderboardTop3Change,
}

impl EventKind {
    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RepoCreated => "repo_created",
            EventKind::NewCommit => "new_commit",
            EventKind::NewRelease => "new_release",
            EventKind::NewModel => "new_model",
            EventKind::ModelUpdate => "model_update",
            EventKind::NewPaper => "new_paper",
            EventKind::NewsArticle => "news_article",
            EventKind::LeaderboardNewEntry => "leaderboard_new_entry",
            EventKind::LeaderboardRankChange => "leaderboard_rank_change",
            EventKind::LeaderboardTop3Change => "leaderboard_top3_change",
        }
    }

    /// Whether an item of this kind is reported even on the very first
    /// observation of an entity/source pair. First observations are otherwise
    /// suppressed to avoid a flood of "new" events for freshly configured
    /// entities; repository discovery is the one change that is always
    /// notable.
    pub fn notable_on_first_observation(&self) -> bool {
        matches!(self, EventKind::RepoCreated)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of a release as inferred from upstream text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStage {
    /// Teased or announced but not yet available.
    Announced,
    /// Actually available for use.
    Launched,
    /// An update to something already released.
    Updated,
    /// Could not be classified.
    #[default]
    Unknown,
}

/// An immutable record of one detected change. Produced by a diff engine,
/// classified by the router, consumed exactly once by the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Semantic kind of the change.
    pub kind: EventKind,

    /// Display name of the watched entity (or board) that triggered it.
    pub entity: String,

    /// The `(entity, source)` state key this event was diffed under.
    pub entity_key: String,

    /// Source the triggering snapshot came from.
    pub source: SourceKind,

    /// The item that triggered the event.
    pub item: Item,

    /// When the diff engine detected the change.
    pub detected_at: DateTime<Utc>,
}
