//! Source watchers: one capability (`fetch`) per entity/source pair.
//!
//! Watchers are stateless: they turn one HTTP round trip into a [`Snapshot`]
//! and never look at previous state. All change detection happens in the
//! diff engines, which is what keeps fetch failures from corrupting state.

pub mod arxiv;
pub mod github;
pub mod huggingface;
pub mod leaderboard;
pub mod modelscope;
pub mod news;
pub mod stage;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::{
    config::AppConfig,
    models::{Snapshot, SourceKind},
};

/// User agent sent to every upstream API.
pub(crate) const USER_AGENT: &str = "modelwatch/0.1";

/// Errors a source watcher can fail with. All of these are per-pair and
/// non-fatal: the pair is retried from the same baseline on the next cycle.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The HTTP request itself failed (connect, timeout, TLS).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream returned a non-success status.
    #[error("Upstream returned status {status} for {url}")]
    Status {
        /// HTTP status code returned.
        status: reqwest::StatusCode,
        /// The requested URL.
        url: String,
    },

    /// The upstream rate-limited the request.
    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    /// The response arrived but could not be interpreted. A partial or
    /// truncated snapshot is reported here rather than passed to the diff
    /// engines.
    #[error("Unexpected payload from upstream: {0}")]
    UnexpectedPayload(String),
}

/// A capability that produces a fresh snapshot for one entity from one
/// source. One call per pair per poll cycle.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SourceWatcher: Send + Sync {
    /// The source kind this watcher reads from.
    fn source(&self) -> SourceKind;

    /// The watched entity's display name (or board name for leaderboards).
    fn entity(&self) -> &str;

    /// Fetches the current upstream truth as a snapshot, or signals failure.
    async fn fetch(&self) -> Result<Snapshot, SourceError>;
}

/// The state-store key for a watcher: `source:entity`, unique per pair.
pub fn state_key(source: SourceKind, entity: &str) -> String {
    format!("{source}:{entity}")
}

/// Builds the full set of watchers for the configured watch list and
/// enabled leaderboard boards.
pub fn build_watchers(config: &AppConfig, client: &reqwest::Client) -> Vec<Box<dyn SourceWatcher>> {
    let mut watchers: Vec<Box<dyn SourceWatcher>> = Vec::new();

    for model in &config.models {
        if let Some(repo) = &model.github {
            watchers.push(Box::new(github::GitHubWatcher::new(
                model.name.clone(),
                repo.clone(),
                config.github_token.clone(),
                client.clone(),
            )));
        }
        if let Some(model_id) = &model.huggingface {
            watchers.push(Box::new(huggingface::HuggingFaceWatcher::new(
                model.name.clone(),
                model_id.clone(),
                config.huggingface_token.clone(),
                client.clone(),
            )));
        }
        if let Some(model_id) = &model.modelscope {
            watchers.push(Box::new(modelscope::ModelScopeWatcher::new(
                model.name.clone(),
                model_id.clone(),
                client.clone(),
            )));
        }
        if let Some(query) = &model.arxiv_query {
            watchers.push(Box::new(arxiv::ArxivWatcher::new(
                model.name.clone(),
                query.clone(),
                client.clone(),
            )));
        }
        if let Some(keywords) = &model.news_keywords {
            watchers.push(Box::new(news::NewsWatcher::new(
                model.name.clone(),
                keywords.clone(),
                client.clone(),
            )));
        }
    }

    for board in config.leaderboards.enabled_boards() {
        watchers.push(Box::new(leaderboard::LeaderboardWatcher::new(
            board,
            config.leaderboards.max_rank,
            config.artificial_analysis_api_key.clone(),
            client.clone(),
        )));
    }

    watchers
}
