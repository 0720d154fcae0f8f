//! Hugging Face Hub source watcher: model discovery and revision changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{SourceError, SourceWatcher, USER_AGENT};
use crate::models::{EventKind, Item, ItemSnapshot, ReleaseStage, Snapshot, SourceKind};

const DEFAULT_API_BASE: &str = "https://huggingface.co";

/// How many hub revisions to inspect per cycle.
const COMMIT_WINDOW: usize = 10;

#[derive(Debug, Deserialize)]
struct ModelResponse {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastModified")]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    likes: u64,
    #[serde(rename = "pipeline_tag", default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HubCommit {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    date: Option<DateTime<Utc>>,
}

/// Watches one Hugging Face Hub model for first publication and new
/// revisions. A model that is not published yet (404) produces an empty
/// snapshot, so the `new_model` event fires on the cycle it appears.
pub struct HuggingFaceWatcher {
    entity: String,
    model_id: String,
    token: Option<String>,
    client: reqwest::Client,
    api_base: String,
}

impl HuggingFaceWatcher {
    /// Creates a watcher for a hub model id in `owner/model` form.
    pub fn new(
        entity: String,
        model_id: String,
        token: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        Self { entity, model_id, token, client, api_base: DEFAULT_API_BASE.to_string() }
    }

    /// Overrides the API base URL. Used by tests against a local mock
    /// server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SourceError> {
        let mut request = self.client.get(url).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited("huggingface returned 429".to_string()));
        }
        Ok(response)
    }

    fn model_item(&self, model: &ModelResponse) -> Item {
        let timestamp = model.created_at.or(model.last_modified).unwrap_or_else(Utc::now);
        let description = match model.description.as_deref() {
            Some(text) if !text.is_empty() => text.chars().take(300).collect(),
            _ => format!("Pipeline: {}", model.pipeline_tag.as_deref().unwrap_or("N/A")),
        };

        Item {
            id: format!("model:{}", model.id),
            fingerprint: timestamp.to_rfc3339(),
            kind: EventKind::NewModel,
            title: format!("Model discovered: {}", model.id),
            description,
            url: format!("https://huggingface.co/{}", model.id),
            timestamp,
            stage: ReleaseStage::Launched,
            extra: serde_json::json!({
                "downloads": model.downloads,
                "likes": model.likes,
                "pipeline_tag": model.pipeline_tag,
                "tags": model.tags.iter().take(5).collect::<Vec<_>>(),
            }),
        }
    }

    fn commit_item(&self, commit: &HubCommit) -> Item {
        let title: String =
            commit.title.clone().unwrap_or_else(|| "Update".to_string()).chars().take(100).collect();
        let author = commit.authors.first().cloned().unwrap_or_else(|| "Unknown".to_string());
        Item {
            id: commit.id.clone(),
            fingerprint: commit.id.clone(),
            kind: EventKind::NewCommit,
            title,
            description: format!("Author: {author}"),
            url: format!("https://huggingface.co/{}/commit/{}", self.model_id, commit.id),
            timestamp: commit.date.unwrap_or_else(Utc::now),
            stage: ReleaseStage::Updated,
            extra: serde_json::json!({
                "commit_id": commit.id.chars().take(7).collect::<String>(),
            }),
        }
    }
}

#[async_trait]
impl SourceWatcher for HuggingFaceWatcher {
    fn source(&self) -> SourceKind {
        SourceKind::Huggingface
    }

    fn entity(&self) -> &str {
        &self.entity
    }

    #[tracing::instrument(skip(self), fields(model_id = %self.model_id), level = "debug")]
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let model_url = format!("{}/api/models/{}", self.api_base, self.model_id);
        let response = self.get(&model_url).await?;

        // Not published yet: an empty snapshot keeps the pair observed
        // without inventing items.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(model_id = %self.model_id, "Model not published yet.");
            return Ok(Snapshot::Items(ItemSnapshot::default()));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { status, url: model_url });
        }
        let model: ModelResponse = response.json().await?;

        let commits_url = format!("{}/api/models/{}/commits/main", self.api_base, self.model_id);
        let commits_response = self.get(&commits_url).await?;
        let commits: Vec<HubCommit> = if commits_response.status().is_success() {
            commits_response.json().await?
        } else {
            Vec::new()
        };

        let model_item = self.model_item(&model);
        let fingerprint = commits
            .first()
            .map(|c| c.id.clone())
            .or_else(|| model.last_modified.map(|t| t.to_rfc3339()));

        let mut items = vec![model_item.clone()];
        items.extend(commits.iter().take(COMMIT_WINDOW).map(|c| self.commit_item(c)));

        // When the revision pointer moves without a new revision id (e.g.
        // force push), the update event is attributed to the model itself.
        let head = Some(Item {
            kind: EventKind::ModelUpdate,
            title: format!("Model updated: {}", self.model_id),
            stage: ReleaseStage::Updated,
            ..model_item
        });

        Ok(Snapshot::Items(ItemSnapshot { items, fingerprint, head }))
    }
}
