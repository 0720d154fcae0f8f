//! ModelScope source watcher: model discovery and modification tracking.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use super::{SourceError, SourceWatcher, USER_AGENT};
use crate::models::{EventKind, Item, ItemSnapshot, ReleaseStage, Snapshot, SourceKind};

const DEFAULT_API_BASE: &str = "https://modelscope.cn";

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(rename = "Code", default)]
    code: i64,
    #[serde(rename = "Data")]
    data: Option<ModelData>,
}

#[derive(Debug, Deserialize)]
struct ModelData {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "ChineseName", default)]
    chinese_name: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "CreatedTime")]
    created_time: Option<i64>,
    #[serde(rename = "LastUpdatedTime")]
    last_updated_time: Option<i64>,
    #[serde(rename = "Downloads", default)]
    downloads: u64,
    #[serde(rename = "Stars", default)]
    stars: u64,
}

/// Watches one ModelScope model. The API exposes no revision listing, so
/// changes are tracked entirely through the modification timestamp
/// fingerprint and surface as `model_update` events.
pub struct ModelScopeWatcher {
    entity: String,
    model_id: String,
    client: reqwest::Client,
    api_base: String,
}

impl ModelScopeWatcher {
    /// Creates a watcher for a model id in `owner/model` form.
    pub fn new(entity: String, model_id: String, client: reqwest::Client) -> Self {
        Self { entity, model_id, client, api_base: DEFAULT_API_BASE.to_string() }
    }

    /// Overrides the API base URL. Used by tests against a local mock
    /// server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn epoch_to_utc(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(secs, 0).single()
    }

    fn model_item(&self, data: &ModelData) -> Item {
        let timestamp = data
            .created_time
            .and_then(Self::epoch_to_utc)
            .unwrap_or_else(Utc::now);
        let name = data.name.clone().unwrap_or_else(|| self.model_id.clone());
        let description = data
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| data.chinese_name.clone())
            .unwrap_or_else(|| "No description".to_string())
            .chars()
            .take(300)
            .collect();

        Item {
            id: format!("model:{}", self.model_id),
            fingerprint: timestamp.to_rfc3339(),
            kind: EventKind::NewModel,
            title: format!("ModelScope model discovered: {name}"),
            description,
            url: format!("https://modelscope.cn/models/{}", self.model_id),
            timestamp,
            stage: ReleaseStage::Launched,
            extra: serde_json::json!({
                "downloads": data.downloads,
                "stars": data.stars,
            }),
        }
    }
}

#[async_trait]
impl SourceWatcher for ModelScopeWatcher {
    fn source(&self) -> SourceKind {
        SourceKind::Modelscope
    }

    fn entity(&self) -> &str {
        &self.entity
    }

    #[tracing::instrument(skip(self), fields(model_id = %self.model_id), level = "debug")]
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let url = format!("{}/api/v1/models/{}", self.api_base, self.model_id);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(model_id = %self.model_id, "Model not published yet.");
            return Ok(Snapshot::Items(ItemSnapshot::default()));
        }
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited("modelscope returned 429".to_string()));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { status, url });
        }

        let envelope: ApiEnvelope = response.json().await?;
        // The API wraps a not-found in a 200 with a non-success code.
        let Some(data) = envelope.data else {
            if envelope.code == 200 {
                return Err(SourceError::UnexpectedPayload(
                    "modelscope envelope had no data".to_string(),
                ));
            }
            return Ok(Snapshot::Items(ItemSnapshot::default()));
        };

        let model_item = self.model_item(&data);
        let fingerprint = data
            .last_updated_time
            .and_then(Self::epoch_to_utc)
            .map(|t| t.to_rfc3339());

        let head = Some(Item {
            kind: EventKind::ModelUpdate,
            title: format!("ModelScope model updated: {}", self.model_id),
            stage: ReleaseStage::Updated,
            ..model_item.clone()
        });

        Ok(Snapshot::Items(ItemSnapshot { items: vec![model_item], fingerprint, head }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watcher(server_url: &str) -> ModelScopeWatcher {
        ModelScopeWatcher::new(
            "Z-Image".to_string(),
            "Tongyi-MAI/Z-Image".to_string(),
            reqwest::Client::new(),
        )
        .with_api_base(server_url)
    }

    #[tokio::test]
    async fn published_model_yields_item_and_fingerprint() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/models/Tongyi-MAI/Z-Image")
            .with_status(200)
            .with_body(
                r#"{
                    "Code": 200,
                    "Data": {
                        "Name": "Z-Image",
                        "Description": "Efficient image generation",
                        "CreatedTime": 1764000000,
                        "LastUpdatedTime": 1764100000,
                        "Downloads": 900,
                        "Stars": 55
                    }
                }"#,
            )
            .create_async()
            .await;

        let snapshot = watcher(&server.url()).fetch().await.unwrap();
        let Snapshot::Items(snapshot) = snapshot else { panic!("expected item snapshot") };

        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].kind, EventKind::NewModel);
        assert_eq!(snapshot.items[0].id, "model:Tongyi-MAI/Z-Image");
        assert!(snapshot.fingerprint.is_some());
        assert_eq!(snapshot.head.as_ref().unwrap().kind, EventKind::ModelUpdate);
    }

    #[tokio::test]
    async fn wrapped_not_found_yields_empty_snapshot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/models/Tongyi-MAI/Z-Image")
            .with_status(200)
            .with_body(r#"{"Code": 404, "Data": null}"#)
            .create_async()
            .await;

        let snapshot = watcher(&server.url()).fetch().await.unwrap();
        let Snapshot::Items(snapshot) = snapshot else { panic!("expected item snapshot") };
        assert!(snapshot.items.is_empty());
        assert!(snapshot.fingerprint.is_none());
    }
}
