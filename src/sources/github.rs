//! GitHub source watcher: commits, releases and repository discovery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{stage::detect_release_stage, SourceError, SourceWatcher, USER_AGENT};
use crate::models::{EventKind, Item, ItemSnapshot, ReleaseStage, Snapshot, SourceKind};

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// How many commits and releases to inspect per cycle. Anything older than
/// this window has either been seen already or will never be reported.
const COMMIT_PAGE_SIZE: u32 = 10;
const RELEASE_PAGE_SIZE: u32 = 5;

#[derive(Debug, Deserialize)]
struct RepoResponse {
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    html_url: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    id: u64,
    tag_name: Option<String>,
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    html_url: Option<String>,
    #[serde(default)]
    prerelease: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<serde_json::Value>,
}

/// Watches one GitHub repository for commits, releases and first-time
/// discovery of the repository itself.
pub struct GitHubWatcher {
    entity: String,
    repo: String,
    token: Option<String>,
    client: reqwest::Client,
    api_base: String,
}

impl GitHubWatcher {
    /// Creates a watcher for `owner/repo`.
    pub fn new(
        entity: String,
        repo: String,
        token: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        Self { entity, repo, token, client, api_base: DEFAULT_API_BASE.to_string() }
    }

    /// Overrides the API base URL. Used by tests against a local mock
    /// server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            return Err(SourceError::RateLimited(format!("github returned {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Status { status, url: url.to_string() });
        }

        Ok(response.json().await?)
    }

    fn repo_item(&self, repo: &RepoResponse, has_releases: bool) -> Item {
        let description = repo.description.clone().unwrap_or_default();
        let mut stage = detect_release_stage(&description, false);
        if has_releases {
            stage = ReleaseStage::Launched;
        } else if stage == ReleaseStage::Unknown {
            // A repo without releases is most likely an announcement.
            stage = ReleaseStage::Announced;
        }

        Item {
            id: format!("repo:{}", repo.full_name),
            fingerprint: repo.created_at.to_rfc3339(),
            kind: EventKind::RepoCreated,
            title: format!("Repository discovered: {}", repo.full_name),
            description: if description.is_empty() {
                "No description".to_string()
            } else {
                description
            },
            url: repo.html_url.clone(),
            timestamp: repo.created_at,
            stage,
            extra: serde_json::json!({
                "stars": repo.stargazers_count,
                "forks": repo.forks_count,
                "language": repo.language,
            }),
        }
    }

    fn commit_item(&self, commit: &CommitResponse) -> Item {
        let message = commit.commit.message.as_str();
        let title: String = message.lines().next().unwrap_or("No message").chars().take(100).collect();
        let author = commit.commit.author.as_ref();
        let author_name =
            author.and_then(|a| a.name.clone()).unwrap_or_else(|| "Unknown".to_string());
        let timestamp = author.and_then(|a| a.date).unwrap_or_else(Utc::now);

        Item {
            id: commit.sha.clone(),
            fingerprint: commit.sha.clone(),
            kind: EventKind::NewCommit,
            title,
            description: format!("Author: {author_name}"),
            url: commit.html_url.clone().unwrap_or_default(),
            timestamp,
            stage: detect_release_stage(message, false),
            extra: serde_json::json!({ "sha": commit.sha.chars().take(7).collect::<String>() }),
        }
    }

    fn release_item(&self, release: &ReleaseResponse) -> Item {
        let tag = release.tag_name.clone().unwrap_or_else(|| "Unknown".to_string());
        let name = release.name.clone().unwrap_or_default();
        let body = release.body.clone().unwrap_or_default();
        let has_assets = !release.assets.is_empty();

        let mut stage = detect_release_stage(&format!("{name} {body}"), release.prerelease);
        if has_assets && !release.prerelease {
            stage = ReleaseStage::Launched;
        }

        let label = if stage == ReleaseStage::Launched { "Release" } else { "Pre-release" };
        let description: String = if name.is_empty() { body.chars().take(200).collect() } else { name };
        let timestamp = release.published_at.or(release.created_at).unwrap_or_else(Utc::now);

        Item {
            id: format!("release:{}", release.id),
            fingerprint: release.id.to_string(),
            kind: EventKind::NewRelease,
            title: format!("{label}: {tag}"),
            description,
            url: release.html_url.clone().unwrap_or_default(),
            timestamp,
            stage,
            extra: serde_json::json!({
                "tag": tag,
                "prerelease": release.prerelease,
                "has_assets": has_assets,
            }),
        }
    }
}

#[async_trait]
impl SourceWatcher for GitHubWatcher {
    fn source(&self) -> SourceKind {
        SourceKind::Github
    }

    fn entity(&self) -> &str {
        &self.entity
    }

    #[tracing::instrument(skip(self), fields(repo = %self.repo), level = "debug")]
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let repo_url = format!("{}/repos/{}", self.api_base, self.repo);
        let repo: RepoResponse = self.get_json(&repo_url).await?;

        let commits_url =
            format!("{}/repos/{}/commits?per_page={}", self.api_base, self.repo, COMMIT_PAGE_SIZE);
        let commits: Vec<CommitResponse> = self.get_json(&commits_url).await?;

        let releases_url =
            format!("{}/repos/{}/releases?per_page={}", self.api_base, self.repo, RELEASE_PAGE_SIZE);
        let releases: Vec<ReleaseResponse> = self.get_json(&releases_url).await?;

        let fingerprint = commits.first().map(|c| c.sha.clone());

        let mut items = vec![self.repo_item(&repo, !releases.is_empty())];
        items.extend(commits.iter().map(|c| self.commit_item(c)));
        items.extend(releases.iter().map(|r| self.release_item(r)));

        Ok(Snapshot::Items(ItemSnapshot { items, fingerprint, head: None }))
    }
}
