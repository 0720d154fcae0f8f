//! arXiv source watcher: new papers matching a search query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{SourceError, SourceWatcher, USER_AGENT};
use crate::models::{EventKind, Item, ItemSnapshot, ReleaseStage, Snapshot, SourceKind};

const DEFAULT_API_BASE: &str = "http://export.arxiv.org";

/// How many results to request per query.
const MAX_RESULTS: u32 = 10;

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: String,
    #[serde(default)]
    summary: String,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
    #[serde(rename = "@type", default)]
    kind: Option<String>,
}

/// Watches the arXiv Atom API for new papers matching one search query.
pub struct ArxivWatcher {
    entity: String,
    query: String,
    client: reqwest::Client,
    api_base: String,
}

impl ArxivWatcher {
    /// Creates a watcher for an exact-phrase search query.
    pub fn new(entity: String, query: String, client: reqwest::Client) -> Self {
        Self { entity, query, client, api_base: DEFAULT_API_BASE.to_string() }
    }

    /// Overrides the API base URL. Used by tests against a local mock
    /// server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// The stable id portion of an entry id URL, e.g. `2511.09876v1` from
    /// `http://arxiv.org/abs/2511.09876v1`.
    fn arxiv_id(entry_id: &str) -> &str {
        entry_id.rsplit("/abs/").next().unwrap_or(entry_id)
    }

    fn entry_item(&self, entry: &Entry) -> Item {
        let arxiv_id = Self::arxiv_id(&entry.id).to_string();
        let title = entry.title.split_whitespace().collect::<Vec<_>>().join(" ");
        let authors: Vec<&str> = entry.authors.iter().take(3).map(|a| a.name.as_str()).collect();
        let summary: String =
            entry.summary.split_whitespace().collect::<Vec<_>>().join(" ").chars().take(300).collect();
        let timestamp = entry
            .published
            .as_deref()
            .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let url = entry
            .links
            .iter()
            .find(|l| l.kind.as_deref() == Some("text/html") || l.rel.as_deref() == Some("alternate"))
            .map(|l| l.href.clone())
            .unwrap_or_else(|| entry.id.clone());

        Item {
            id: arxiv_id.clone(),
            fingerprint: arxiv_id.clone(),
            kind: EventKind::NewPaper,
            title,
            description: format!("{} — {}", authors.join(", "), summary),
            url,
            timestamp,
            stage: ReleaseStage::Announced,
            extra: serde_json::json!({ "arxiv_id": arxiv_id }),
        }
    }
}

#[async_trait]
impl SourceWatcher for ArxivWatcher {
    fn source(&self) -> SourceKind {
        SourceKind::Arxiv
    }

    fn entity(&self) -> &str {
        &self.entity
    }

    #[tracing::instrument(skip(self), fields(query = %self.query), level = "debug")]
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let search = urlencoding::encode(&format!("all:\"{}\"", self.query)).into_owned();
        let url = format!(
            "{}/api/query?search_query={}&sortBy=submittedDate&sortOrder=descending&max_results={}",
            self.api_base, search, MAX_RESULTS
        );

        let response = self.client.get(&url).header("User-Agent", USER_AGENT).send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited("arxiv returned 429".to_string()));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { status, url });
        }

        let body = response.text().await?;
        let feed: Feed = quick_xml::de::from_str(&body)
            .map_err(|e| SourceError::UnexpectedPayload(format!("arxiv atom parse failed: {e}")))?;

        let items: Vec<Item> = feed.entries.iter().map(|e| self.entry_item(e)).collect();
        let fingerprint = items.first().map(|i| i.id.clone());

        Ok(Snapshot::Items(ItemSnapshot { items, fingerprint, head: None }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query Results</title>
  <entry>
    <id>http://arxiv.org/abs/2511.09876v1</id>
    <title>Z-Image: Efficient
      Text-to-Image Generation</title>
    <summary>We present Z-Image, a model for efficient image synthesis.</summary>
    <published>2025-11-19T18:00:00Z</published>
    <author><name>A. Author</name></author>
    <author><name>B. Author</name></author>
    <link href="http://arxiv.org/abs/2511.09876v1" rel="alternate" type="text/html"/>
    <link href="http://arxiv.org/pdf/2511.09876v1" rel="related" type="application/pdf"/>
  </entry>
</feed>"#;

    #[tokio::test]
    async fn atom_entries_become_paper_items() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex("^/api/query".to_string()))
            .with_status(200)
            .with_body(FEED)
            .create_async()
            .await;

        let watcher =
            ArxivWatcher::new("Z-Image".to_string(), "Z-Image".to_string(), reqwest::Client::new())
                .with_api_base(server.url());

        let snapshot = watcher.fetch().await.unwrap();
        let Snapshot::Items(snapshot) = snapshot else { panic!("expected item snapshot") };

        assert_eq!(snapshot.items.len(), 1);
        let item = &snapshot.items[0];
        assert_eq!(item.id, "2511.09876v1");
        assert_eq!(item.kind, EventKind::NewPaper);
        // Whitespace in multi-line Atom titles is collapsed.
        assert_eq!(item.title, "Z-Image: Efficient Text-to-Image Generation");
        assert_eq!(item.url, "http://arxiv.org/abs/2511.09876v1");
        assert!(item.description.starts_with("A. Author, B. Author"));
        assert_eq!(snapshot.fingerprint.as_deref(), Some("2511.09876v1"));
    }

    #[test]
    fn arxiv_id_strips_abs_prefix() {
        assert_eq!(ArxivWatcher::arxiv_id("http://arxiv.org/abs/2511.09876v1"), "2511.09876v1");
        assert_eq!(ArxivWatcher::arxiv_id("2511.09876v1"), "2511.09876v1");
    }
}
