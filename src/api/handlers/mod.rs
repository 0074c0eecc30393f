//! Route handlers and the pieces they share: the error type every handler
//! returns, the authenticated-caller extractor and body validation helpers.

pub mod auth;
pub mod feed;
pub mod guides;
pub mod health;
pub mod trips;

use axum::{
    Json,
    extract::{FromRequestParts, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;
use utoipa::ToSchema;

use crate::{
    auth::{AuthError, AuthState, User},
    store::{Document, DocumentStore, StoreError, to_document},
};

/// Error body shared by every failure response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub detail: String,
}

/// Body returned by every create route.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Created {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(reason) => Self::BadRequest(reason.to_string()),
            AuthError::DuplicateEmail => Self::BadRequest(err.to_string()),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            err if err.is_unauthenticated() => {
                debug!("request not authenticated: {err}");
                Self::Unauthorized
            }
            err => {
                error!("auth failure: {err}");
                Self::Internal
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("store failure: {err}");
        Self::Internal
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// The authenticated caller of a protected route.
///
/// Resolves `Authorization: Bearer <token>` through the [`AuthState`] request
/// extension; every resolution failure becomes the same `401`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(auth) = parts.extensions.get::<AuthState>().cloned() else {
            error!("auth state extension missing");
            return Err(ApiError::Internal);
        };

        let user = auth.resolver.resolve_headers(&parts.headers).await?;
        Ok(Self(user))
    }
}

/// Request bodies that carry their own field constraints.
pub trait Validate {
    /// # Errors
    /// Returns [`ApiError::BadRequest`] naming the first violated constraint.
    fn validate(&self) -> Result<(), ApiError>;
}

/// Unwrap a JSON body and check its constraints.
///
/// # Errors
/// Returns [`ApiError::BadRequest`] for an unreadable or invalid body.
pub fn valid_body<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    Ok(body)
}

/// Persist `record` in `collection` and return its identifier.
///
/// # Errors
/// Returns [`ApiError::Internal`] on any store failure.
pub async fn insert<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    record: &T,
) -> Result<Created, ApiError> {
    let document: Document = to_document(collection, record)?;
    let id = store.create(collection, &document).await?;
    debug!("created {collection} {id}");
    Ok(Created { id })
}

pub(crate) fn ensure(condition: bool, reason: &str) -> Result<(), ApiError> {
    if condition {
        Ok(())
    } else {
        Err(ApiError::BadRequest(reason.to_string()))
    }
}

pub(crate) fn ensure_not_blank(value: &str, field: &str) -> Result<(), ApiError> {
    ensure(!value.trim().is_empty(), &format!("{field} must not be empty"))
}

pub(crate) fn ensure_http_url(value: Option<&str>, field: &str) -> Result<(), ApiError> {
    match value {
        None => Ok(()),
        Some(value) => ensure(
            Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https")),
            &format!("{field} must be an http or https URL"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn auth_failures_share_one_response() -> anyhow::Result<()> {
        let mut bodies = Vec::new();
        for err in [
            AuthError::MissingCredential,
            AuthError::MalformedCredential,
            AuthError::UnsupportedScheme,
            AuthError::InvalidToken,
            AuthError::UserNotFound,
        ] {
            bodies.push(body_of(ApiError::from(err)).await?);
        }
        for (status, body) in &bodies {
            assert_eq!(*status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, &bodies[0].1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn client_and_infrastructure_errors_map_to_status() -> anyhow::Result<()> {
        let (status, _) = body_of(AuthError::DuplicateEmail.into()).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = body_of(AuthError::InvalidInput("invalid email").into()).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = body_of(AuthError::InvalidCredentials.into()).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            body_of(AuthError::Config("session ttl overflows".to_string()).into()).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");

        let (status, body) =
            body_of(StoreError::Unavailable("secret connection detail".to_string()).into())
                .await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
        Ok(())
    }

    #[test]
    fn http_url_check() {
        assert!(ensure_http_url(None, "avatar_url").is_ok());
        assert!(ensure_http_url(Some("https://cdn.example.com/a.png"), "avatar_url").is_ok());
        assert!(ensure_http_url(Some("ftp://example.com/a.png"), "avatar_url").is_err());
        assert!(ensure_http_url(Some("not a url"), "avatar_url").is_err());
    }
}
