//! Custom Axum extractors

use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use relwatch_core::{RepositoryId, UserId};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Header carrying the caller's opaque user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity from `x-user-id`. Missing, blank or non-UTF-8 values
/// mean the anonymous user; nothing else is validated.
pub struct UserIdentity(pub Option<UserId>);

impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok());
        Ok(Self(UserId::from_raw(raw)))
    }
}

/// Extract and validate a repository id from path
pub struct ValidRepositoryId(pub RepositoryId);

impl<S> FromRequestParts<S> for ValidRepositoryId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::validation("missing repository id"))?;

        Ok(Self(id.parse::<RepositoryId>()?))
    }
}

/// `Json<T>` whose rejections use the API's JSON error body
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
