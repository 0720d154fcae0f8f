//! Snapshot types: the fresh observation a source watcher returns for one
//! entity/source pair.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{EventKind, ReleaseStage};

/// The kind of external source a snapshot was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// GitHub repositories (commits, releases, repo discovery).
    Github,
    /// Hugging Face Hub models.
    Huggingface,
    /// ModelScope models.
    Modelscope,
    /// arXiv paper feed.
    Arxiv,
    /// News RSS feed.
    News,
    /// Artificial Analysis ranked leaderboards.
    Leaderboard,
}

impl SourceKind {
    /// Stable snake_case name, used in state keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Github => "github",
            SourceKind::Huggingface => "huggingface",
            SourceKind::Modelscope => "modelscope",
            SourceKind::Arxiv => "arxiv",
            SourceKind::News => "news",
            SourceKind::Leaderboard => "leaderboard",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observed item within a snapshot: one commit, release, model,
/// paper or article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier used for deduplication (commit SHA, release id,
    /// paper id, hashed article link).
    pub id: String,

    /// Opaque content marker for this item.
    pub fingerprint: String,

    /// The event kind a diff engine reports this item under.
    pub kind: EventKind,

    /// Human-readable title.
    pub title: String,

    /// Short description for the notification body.
    pub description: String,

    /// Link to the item upstream.
    pub url: String,

    /// Upstream timestamp of the item.
    pub timestamp: DateTime<Utc>,

    /// Inferred release stage, where the source supports it.
    #[serde(default)]
    pub stage: ReleaseStage,

    /// Source-specific metadata carried through to notifications.
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// A snapshot of unordered or chronologically ordered items from one source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemSnapshot {
    /// Observed items, in upstream order (typically newest first).
    pub items: Vec<Item>,

    /// Optional single mutable marker of current source state (e.g. latest
    /// model revision). A change with an unchanged item set yields a
    /// `model_update` event.
    pub fingerprint: Option<String>,

    /// The item to attach to a `model_update` event when only the
    /// fingerprint moved.
    pub head: Option<Item>,
}

/// One entry of a ranked list at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Upstream identifier of the ranked model.
    pub id: String,

    /// Display name of the ranked model.
    pub name: String,

    /// 1-based rank within the board.
    pub rank: u32,

    /// Upstream score (e.g. ELO) backing the rank.
    pub score: f64,

    /// Creator / organization, when reported.
    #[serde(default)]
    pub creator: Option<String>,
}

/// The ordered ranked list for one board, truncated to the configured
/// `max_rank` window. Entries keep the upstream board's own ordering; the
/// diff engine never re-sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    /// Board name, e.g. "text-to-image".
    pub board: String,

    /// Entries within the tracked window, in upstream order.
    pub entries: Vec<RankedEntry>,
}

impl LeaderboardSnapshot {
    /// The entries currently occupying ranks 1 through 3, in rank order.
    pub fn top3(&self) -> Vec<&RankedEntry> {
        let mut top: Vec<&RankedEntry> = self.entries.iter().filter(|e| e.rank <= 3).collect();
        top.sort_by_key(|e| e.rank);
        top
    }

    /// Looks up an entry by id.
    pub fn entry(&self, id: &str) -> Option<&RankedEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

/// Kind-tagged snapshot: what a `SourceWatcher` hands to the scheduler.
/// Non-ranked sources produce item snapshots; leaderboard watchers produce
/// one ranked snapshot per board.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// Item-set snapshot for the generic diff engine.
    Items(ItemSnapshot),
    /// Ordered ranked list for the leaderboard diff engine.
    Ranked(LeaderboardSnapshot),
}
