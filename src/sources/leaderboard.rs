//! Artificial Analysis leaderboard watcher: ranked media-arena standings.

use async_trait::async_trait;
use serde::Deserialize;

use super::{SourceError, SourceWatcher, USER_AGENT};
use crate::models::{LeaderboardSnapshot, RankedEntry, Snapshot, SourceKind};

const DEFAULT_API_BASE: &str = "https://artificialanalysis.ai";

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    data: Vec<ApiEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    id: Option<String>,
    name: Option<String>,
    rank: Option<u32>,
    #[serde(default)]
    elo: Option<f64>,
    model_creator: Option<ApiCreator>,
}

#[derive(Debug, Deserialize)]
struct ApiCreator {
    name: Option<String>,
}

/// Watches one Artificial Analysis media arena board. Returns a ranked
/// snapshot truncated to the configured rank window; rank mathematics is
/// left to the leaderboard diff engine.
pub struct LeaderboardWatcher {
    board: String,
    max_rank: u32,
    api_key: Option<String>,
    client: reqwest::Client,
    api_base: String,
}

impl LeaderboardWatcher {
    /// Creates a watcher for a board slug such as `text-to-image`.
    pub fn new(
        board: String,
        max_rank: u32,
        api_key: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        Self { board, max_rank, api_key, client, api_base: DEFAULT_API_BASE.to_string() }
    }

    /// Overrides the API base URL. Used by tests against a local mock
    /// server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn entry(&self, raw: &ApiEntry) -> Option<RankedEntry> {
        let rank = raw.rank?;
        if rank == 0 || rank > self.max_rank {
            return None;
        }
        let name = raw.name.clone()?;
        Some(RankedEntry {
            id: raw.id.clone().unwrap_or_else(|| name.clone()),
            name,
            rank,
            score: raw.elo.unwrap_or(0.0),
            creator: raw.model_creator.as_ref().and_then(|c| c.name.clone()),
        })
    }
}

#[async_trait]
impl SourceWatcher for LeaderboardWatcher {
    fn source(&self) -> SourceKind {
        SourceKind::Leaderboard
    }

    fn entity(&self) -> &str {
        &self.board
    }

    #[tracing::instrument(skip(self), fields(board = %self.board), level = "debug")]
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let url = format!("{}/api/v2/data/media/{}", self.api_base, self.board);
        let mut request = self.client.get(&url).header("User-Agent", USER_AGENT);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.clone());
        }

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited(format!(
                "artificial analysis rate limited board {}",
                self.board
            )));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { status, url });
        }

        let envelope: ApiEnvelope = response.json().await?;
        let mut entries: Vec<RankedEntry> =
            envelope.data.iter().filter_map(|raw| self.entry(raw)).collect();
        entries.sort_by_key(|e| e.rank);

        Ok(Snapshot::Ranked(LeaderboardSnapshot { board: self.board.clone(), entries }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watcher(server_url: &str, max_rank: u32) -> LeaderboardWatcher {
        LeaderboardWatcher::new(
            "text-to-image".to_string(),
            max_rank,
            Some("key".to_string()),
            reqwest::Client::new(),
        )
        .with_api_base(server_url)
    }

    #[tokio::test]
    async fn entries_are_filtered_to_rank_window_and_sorted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/data/media/text-to-image")
            .match_header("x-api-key", "key")
            .with_status(200)
            .with_body(
                r#"{"data": [
                    {"id": "m2", "name": "Model Two", "rank": 2, "elo": 1150.0,
                     "model_creator": {"name": "Lab B"}},
                    {"id": "m9", "name": "Model Nine", "rank": 9, "elo": 900.0,
                     "model_creator": {"name": "Lab C"}},
                    {"id": "m1", "name": "Model One", "rank": 1, "elo": 1200.0,
                     "model_creator": {"name": "Lab A"}},
                    {"id": "unranked", "name": "No Rank", "elo": 0.0}
                ]}"#,
            )
            .create_async()
            .await;

        let snapshot = watcher(&server.url(), 5).fetch().await.unwrap();
        let Snapshot::Ranked(board) = snapshot else { panic!("expected ranked snapshot") };

        assert_eq!(board.board, "text-to-image");
        // Rank 9 exceeds the window and the unranked entry is dropped.
        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].id, "m1");
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[1].id, "m2");
        assert_eq!(board.entries[1].creator.as_deref(), Some("Lab B"));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/data/media/text-to-image")
            .with_status(429)
            .create_async()
            .await;

        let err = watcher(&server.url(), 5).fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::RateLimited(_)));
    }
}
