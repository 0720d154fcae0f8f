//! Configured subjects being watched across one or more sources.

use serde::Deserialize;

/// Priority tier of a watched entity. High-priority entities can force
/// `@channel` mentions regardless of the event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    /// Standard notification handling.
    #[default]
    Normal,
    /// Every change is treated as mention-worthy.
    High,
}

/// A named subject (typically a model) with the source identifiers it is
/// watched under. Immutable for the duration of one poll cycle; sourced from
/// configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchedEntity {
    /// Display name of the entity, e.g. "Z-Image".
    pub name: String,

    /// GitHub repository in `owner/repo` form.
    #[serde(default)]
    pub github: Option<String>,

    /// Hugging Face Hub model id in `owner/model` form.
    #[serde(default)]
    pub huggingface: Option<String>,

    /// ModelScope model id in `owner/model` form.
    #[serde(default)]
    pub modelscope: Option<String>,

    /// Free-text arXiv search query.
    #[serde(default)]
    pub arxiv_query: Option<String>,

    /// Keywords for the news feed search.
    #[serde(default)]
    pub news_keywords: Option<String>,

    /// Priority tier for notification routing.
    #[serde(default)]
    pub priority: PriorityTier,
}

impl WatchedEntity {
    /// Returns true if at least one source identifier is configured.
    pub fn has_sources(&self) -> bool {
        self.github.is_some()
            || self.huggingface.is_some()
            || self.modelscope.is_some()
            || self.arxiv_query.is_some()
            || self.news_keywords.is_some()
    }

    /// Whether this entity is configured as high priority.
    pub fn is_high_priority(&self) -> bool {
        self.priority == PriorityTier::High
    }
}
