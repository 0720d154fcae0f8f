//! Google News source watcher: RSS search results for keyword queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{stage::detect_release_stage, SourceError, SourceWatcher, USER_AGENT};
use crate::models::{EventKind, Item, ItemSnapshot, Snapshot, SourceKind};

const DEFAULT_API_BASE: &str = "https://news.google.com";

/// How many articles to keep per cycle.
const ARTICLE_WINDOW: usize = 15;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: String,
    link: String,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<NewsSource>,
}

#[derive(Debug, Deserialize)]
struct NewsSource {
    #[serde(rename = "$text")]
    name: Option<String>,
}

/// Watches Google News search results for one keyword query. Article links
/// are redirect URLs with no stable upstream id, so the item id is a hash
/// of the link.
pub struct NewsWatcher {
    entity: String,
    keywords: String,
    client: reqwest::Client,
    api_base: String,
}

impl NewsWatcher {
    /// Creates a watcher for a keyword query string.
    pub fn new(entity: String, keywords: String, client: reqwest::Client) -> Self {
        Self { entity, keywords, client, api_base: DEFAULT_API_BASE.to_string() }
    }

    /// Overrides the API base URL. Used by tests against a local mock
    /// server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn article_id(link: &str) -> String {
        let digest = Sha256::digest(link.as_bytes());
        format!("news:{}", &hex::encode(digest)[..16])
    }

    /// Google News appends ` - Publisher` to every title; strip it when a
    /// source element already names the publisher.
    fn clean_title(title: &str, source_name: Option<&str>) -> String {
        if let Some(source_name) = source_name {
            if let Some(stripped) = title.strip_suffix(&format!(" - {source_name}")) {
                return stripped.to_string();
            }
        }
        title.rsplit_once(" - ").map(|(head, _)| head.to_string()).unwrap_or_else(|| title.to_string())
    }

    fn article_item(&self, article: &RssItem) -> Item {
        let source_name = article.source.as_ref().and_then(|s| s.name.as_deref());
        let title = Self::clean_title(&article.title, source_name);
        let timestamp = article
            .pub_date
            .as_deref()
            .and_then(|p| DateTime::parse_from_rfc2822(p).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let id = Self::article_id(&article.link);

        Item {
            id: id.clone(),
            fingerprint: id,
            kind: EventKind::NewsArticle,
            title: title.clone(),
            description: format!("Source: {}", source_name.unwrap_or("Unknown")),
            url: article.link.clone(),
            timestamp,
            stage: detect_release_stage(&title, false),
            extra: serde_json::json!({ "publisher": source_name }),
        }
    }
}

#[async_trait]
impl SourceWatcher for NewsWatcher {
    fn source(&self) -> SourceKind {
        SourceKind::News
    }

    fn entity(&self) -> &str {
        &self.entity
    }

    #[tracing::instrument(skip(self), fields(keywords = %self.keywords), level = "debug")]
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let query = urlencoding::encode(&self.keywords).into_owned();
        let url = format!(
            "{}/rss/search?q={}&hl=en-US&gl=US&ceid=US:en",
            self.api_base, query
        );

        let response = self.client.get(&url).header("User-Agent", USER_AGENT).send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited("google news returned 429".to_string()));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { status, url });
        }

        let body = response.text().await?;
        let rss: Rss = quick_xml::de::from_str(&body)
            .map_err(|e| SourceError::UnexpectedPayload(format!("news rss parse failed: {e}")))?;

        let items: Vec<Item> = rss
            .channel
            .items
            .iter()
            .take(ARTICLE_WINDOW)
            .map(|a| self.article_item(a))
            .collect();

        Ok(Snapshot::Items(ItemSnapshot { items, fingerprint: None, head: None }))
    }
}
