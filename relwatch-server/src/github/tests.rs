//! Tests for the GitHub API client and types.

use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use relwatch_core::provider::MetadataProvider;
use relwatch_core::ProviderError;
use serde_json::json;

use super::client::{GitHubClient, GitHubConfig, GitHubError};
use super::types::{GitHubRelease, GitHubRepository};

fn config(base_url: &str) -> GitHubConfig {
    GitHubConfig {
        base_url: base_url.into(),
        token: None,
        timeout: Duration::from_secs(5),
    }
}

// =============================================================================
// Client construction tests
// =============================================================================

#[test]
fn empty_base_url_returns_config_error() {
    let err = GitHubClient::new(&config("")).unwrap_err();
    assert!(matches!(err, GitHubError::Config(_)));
}

#[test]
fn token_with_newline_returns_config_error() {
    let mut cfg = config("https://api.github.com");
    cfg.token = Some("ghp_bad\ntoken".into());
    let err = GitHubClient::new(&cfg).unwrap_err();
    assert!(matches!(err, GitHubError::Config(_)));
}

#[test]
fn blank_token_is_treated_as_none() {
    let mut cfg = config("https://api.github.com");
    cfg.token = Some("   ".into());
    assert!(GitHubClient::new(&cfg).is_ok());
}

#[test]
fn trailing_slash_stripped_from_base_url() {
    let client = GitHubClient::new(&config("https://api.github.com/")).unwrap();
    assert_eq!(
        client.api_url("/repos/foo/bar"),
        "https://api.github.com/repos/foo/bar"
    );
}

#[test]
fn core_config_converts() {
    let mut core = relwatch_core::config::GitHubConfig::default();
    core.token = Some("ghp_x".into());
    core.timeout_secs = 0;
    let cfg = GitHubConfig::from(&core);
    assert_eq!(cfg.base_url, "https://api.github.com");
    assert_eq!(cfg.token.as_deref(), Some("ghp_x"));
    assert_eq!(cfg.timeout, Duration::from_secs(1));
}

// =============================================================================
// Deserialization tests
// =============================================================================

#[test]
fn deserialize_repository() {
    let json = r#"{
        "id": 1296269,
        "full_name": "octocat/Hello-World",
        "html_url": "https://github.com/octocat/Hello-World",
        "description": "This your first repo!",
        "archived": false,
        "stargazers_count": 80
    }"#;
    let repo: GitHubRepository = serde_json::from_str(json).unwrap();
    assert_eq!(repo.full_name, "octocat/Hello-World");

    let meta: relwatch_core::provider::RepoMetadata = repo.into();
    assert_eq!(meta.url, "https://github.com/octocat/Hello-World");
    assert_eq!(meta.description.as_deref(), Some("This your first repo!"));
}

#[test]
fn deserialize_repository_null_description() {
    let json = r#"{
        "full_name": "foo/bar",
        "html_url": "https://github.com/foo/bar",
        "description": null
    }"#;
    let repo: GitHubRepository = serde_json::from_str(json).unwrap();
    assert!(repo.description.is_none());
    assert!(!repo.archived);
}

#[test]
fn deserialize_release() {
    let json = r#"{
        "id": 1,
        "tag_name": "v1.0.0",
        "name": "v1.0.0",
        "draft": false,
        "prerelease": false,
        "published_at": "2013-02-27T19:35:32Z",
        "html_url": "https://github.com/octocat/Hello-World/releases/v1.0.0",
        "body": "Description of the release"
    }"#;
    let release: GitHubRelease = serde_json::from_str(json).unwrap();
    assert_eq!(release.tag_name, "v1.0.0");

    let meta: relwatch_core::provider::ReleaseMetadata = release.into();
    assert_eq!(
        meta.published_at.map(|t| t.to_rfc3339()),
        Some("2013-02-27T19:35:32+00:00".to_string())
    );
    assert_eq!(meta.notes.as_deref(), Some("Description of the release"));
}

#[test]
fn deserialize_release_minimal() {
    let json = r#"{"id": 2, "tag_name": "nightly", "published_at": null, "body": ""}"#;
    let release: GitHubRelease = serde_json::from_str(json).unwrap();
    let meta: relwatch_core::provider::ReleaseMetadata = release.into();
    assert!(meta.published_at.is_none());
    assert!(meta.notes.is_none());
    assert!(meta.html_url.is_none());
}

// =============================================================================
// Error mapping
// =============================================================================

#[test]
fn not_found_maps_to_provider_not_found() {
    let err: ProviderError = GitHubError::NotFound.into();
    assert!(matches!(err, ProviderError::NotFound));
}

#[test]
fn api_error_keeps_status() {
    let err: ProviderError = GitHubError::Api {
        status: 403,
        message: "API rate limit exceeded".into(),
    }
    .into();
    assert!(matches!(err, ProviderError::Api { status: 403, ref message } if message.contains("rate limit")));
}

// =============================================================================
// Against a local stand-in for the API
// =============================================================================

async fn fake_repo(Path((owner, name)): Path<(String, String)>) -> Result<Json<serde_json::Value>, StatusCode> {
    match (owner.as_str(), name.as_str()) {
        ("foo", "bar") | ("foo", "empty") => Ok(Json(json!({
            "full_name": format!("{owner}/{name}"),
            "html_url": format!("https://github.com/{owner}/{name}"),
            "description": "fake"
        }))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn fake_latest(
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    if headers.get("user-agent").and_then(|v| v.to_str().ok()) != Some("relwatch") {
        return (StatusCode::FORBIDDEN, Json(json!({"message": "missing user agent"})));
    }
    match (owner.as_str(), name.as_str()) {
        ("foo", "bar") => (
            StatusCode::OK,
            Json(json!({
                "id": 7,
                "tag_name": "v2.0",
                "published_at": "2024-05-01T00:00:00Z",
                "html_url": "https://github.com/foo/bar/releases/tag/v2.0"
            })),
        ),
        ("foo", "limited") => (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "API rate limit exceeded"})),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))),
    }
}

async fn spawn_fake_github() -> String {
    let app = Router::new()
        .route("/repos/{owner}/{name}", get(fake_repo))
        .route("/repos/{owner}/{name}/releases/latest", get(fake_latest));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetches_repository_and_latest_release() {
    let client = GitHubClient::new(&config(&spawn_fake_github().await)).unwrap();

    let repo = client.get_repo("foo", "bar").await.unwrap();
    assert_eq!(repo.url, "https://github.com/foo/bar");

    let release = MetadataProvider::get_latest_release(&client, "foo", "bar")
        .await
        .unwrap();
    assert_eq!(release.tag_name, "v2.0");
}

#[tokio::test]
async fn missing_release_is_not_found() {
    let client = GitHubClient::new(&config(&spawn_fake_github().await)).unwrap();

    let err = MetadataProvider::get_latest_release(&client, "foo", "empty")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound));

    let err = client.get_repo("nobody", "nothing").await.unwrap_err();
    assert!(matches!(err, ProviderError::NotFound));
}

#[tokio::test]
async fn error_status_carries_github_message() {
    let client = GitHubClient::new(&config(&spawn_fake_github().await)).unwrap();

    let err = client.get_latest_release("foo", "limited").await.unwrap_err();
    assert!(matches!(
        err,
        GitHubError::Api { status: 403, ref message } if message == "API rate limit exceeded"
    ));
}

#[tokio::test]
async fn unreachable_api_is_transport_error() {
    // nothing listens on port 1
    let client = GitHubClient::new(&config("http://127.0.0.1:1")).unwrap();
    let err = client.get_repo("foo", "bar").await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
}
