//! Repository endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use relwatch_core::{ReleaseId, RepositoryView, SeenStatus};
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::http::extractors::{UserIdentity, ValidJson, ValidRepositoryId};
use crate::http::server::AppState;

/// Query parameters for listing
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Only repositories whose latest release is unseen
    #[serde(default)]
    pub unseen: bool,
}

/// Add repository request
#[derive(Deserialize)]
pub struct AddRepositoryRequest {
    pub url: String,
}

/// Mark seen request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenRequest {
    pub release_id: ReleaseId,
}

/// GET /repositories - every tracked repository with the caller's seen status
async fn list_repositories(
    State(state): State<Arc<AppState>>,
    UserIdentity(user): UserIdentity,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<RepositoryView>>, ApiError> {
    let ctx = state.tracker.context(user);
    let mut views = state.tracker.list_repositories(&ctx).await?;
    if params.unseen {
        views.retain(|view| view.seen.is_unseen);
    }
    Ok(Json(views))
}

/// POST /repositories - start tracking a GitHub repository
async fn add_repository(
    State(state): State<Arc<AppState>>,
    UserIdentity(user): UserIdentity,
    ValidJson(req): ValidJson<AddRepositoryRequest>,
) -> Result<(StatusCode, Json<RepositoryView>), ApiError> {
    let ctx = state.tracker.context(user);
    let view = state.tracker.add_repository(&ctx, &req.url).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /repositories/{id}/refresh - fetch and store the latest release
async fn refresh_repository(
    State(state): State<Arc<AppState>>,
    UserIdentity(user): UserIdentity,
    ValidRepositoryId(id): ValidRepositoryId,
) -> Result<Json<RepositoryView>, ApiError> {
    let ctx = state.tracker.context(user);
    Ok(Json(state.tracker.refresh_repository(&ctx, id).await?))
}

/// POST /repositories/{id}/seen - acknowledge a release
async fn mark_seen(
    State(state): State<Arc<AppState>>,
    UserIdentity(user): UserIdentity,
    ValidRepositoryId(id): ValidRepositoryId,
    ValidJson(req): ValidJson<MarkSeenRequest>,
) -> Result<Json<SeenStatus>, ApiError> {
    let ctx = state.tracker.context(user);
    let status = state
        .tracker
        .mark_release_seen(&ctx, id, req.release_id)
        .await?;
    Ok(Json(status))
}

/// Repository routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/repositories", get(list_repositories).post(add_repository))
        .route("/repositories/{id}/refresh", post(refresh_repository))
        .route("/repositories/{id}/seen", post(mark_seen))
}
