//! GitHub REST API client.
//!
//! Uses reqwest to fetch repository metadata and the latest published
//! release. Implements [`MetadataProvider`] for the tracker.

use std::time::Duration;

use async_trait::async_trait;
use relwatch_core::provider::{MetadataProvider, ReleaseMetadata, RepoMetadata};
use relwatch_core::ProviderError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::types::{GitHubErrorBody, GitHubRelease, GitHubRepository};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

/// GitHub API client errors.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found on GitHub")]
    NotFound,

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<GitHubError> for ProviderError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::NotFound => ProviderError::NotFound,
            GitHubError::Api { status, message } => ProviderError::Api { status, message },
            GitHubError::Http(e) if e.is_decode() => ProviderError::Decode(e.to_string()),
            other => ProviderError::Transport(other.to_string()),
        }
    }
}

/// Configuration for the GitHub client.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API root (e.g. "<https://api.github.com>").
    pub base_url: String,
    /// Optional token; unauthenticated requests get a lower rate limit.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&relwatch_core::config::GitHubConfig> for GitHubConfig {
    fn from(config: &relwatch_core::config::GitHubConfig) -> Self {
        Self {
            base_url: config.api_url.clone(),
            token: config.token.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

/// GitHub REST API client.
#[derive(Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    pub fn new(config: &GitHubConfig) -> Result<Self, GitHubError> {
        if config.base_url.trim().is_empty() {
            return Err(GitHubError::Config("base_url is empty".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("relwatch"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        if let Some(token) = config.token.as_deref().filter(|t| !t.trim().is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| GitHubError::Config("Invalid token format".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// Build the API URL for a given path.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-success statuses to errors. 404 is its own variant since it
    /// carries meaning for the caller.
    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound);
        }

        let fallback = status.canonical_reason().unwrap_or("Unknown").to_string();
        let message = match resp.json::<GitHubErrorBody>().await {
            Ok(body) if !body.message.is_empty() => body.message,
            _ => fallback,
        };
        Err(GitHubError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        let url = self.api_url(path);
        tracing::debug!(%url, "GitHub request");
        let resp = self.http.get(&url).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Get a repository.
    pub async fn get_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<GitHubRepository, GitHubError> {
        self.get_json(&format!("/repos/{owner}/{name}")).await
    }

    /// Get the latest published, non-draft, non-prerelease release.
    /// [`GitHubError::NotFound`] if there is none.
    pub async fn get_latest_release(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<GitHubRelease, GitHubError> {
        self.get_json(&format!("/repos/{owner}/{name}/releases/latest"))
            .await
    }
}

#[async_trait]
impl MetadataProvider for GitHubClient {
    async fn get_repo(&self, owner: &str, name: &str) -> Result<RepoMetadata, ProviderError> {
        Ok(self.get_repository(owner, name).await?.into())
    }

    async fn get_latest_release(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<ReleaseMetadata, ProviderError> {
        Ok(GitHubClient::get_latest_release(self, owner, name)
            .await?
            .into())
    }
}
