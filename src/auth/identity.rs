//! Bearer token extraction and user resolution for protected routes.
//!
//! Flow: parse `Authorization: <scheme> <token>`, validate the token through
//! the session manager, then load the owning user. A session whose user is
//! gone does not authenticate anyone.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    AuthError,
    models::{USER_COLLECTION, User},
    session::SessionManager,
};
use crate::store::{Filter, INTERNAL_ID_FIELD, SharedStore, find_one};

pub const BEARER_SCHEME: &str = "Bearer";

pub struct IdentityResolver {
    sessions: Arc<SessionManager>,
    store: SharedStore,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>, store: SharedStore) -> Self {
        Self { sessions, store }
    }

    /// Resolve an `Authorization` header value to the user it authenticates.
    ///
    /// # Errors
    /// `MissingCredential`, `MalformedCredential`, `UnsupportedScheme`,
    /// `InvalidToken` or `UserNotFound`, or a store error.
    #[instrument(skip_all)]
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<User, AuthError> {
        let token = parse_bearer(authorization)?;
        let user_id = self.sessions.validate(token).await?;

        let filter = Filter::new().eq(INTERNAL_ID_FIELD, user_id.as_str());
        match find_one::<User>(self.store.as_ref(), USER_COLLECTION, &filter).await? {
            Some(user) => Ok(user),
            None => {
                debug!("session references missing user {user_id}");
                Err(AuthError::UserNotFound)
            }
        }
    }

    /// Same as [`resolve`](Self::resolve), reading the header from a request.
    ///
    /// # Errors
    /// As [`resolve`](Self::resolve); a header that is not valid text is
    /// `MalformedCredential`.
    pub async fn resolve_headers(&self, headers: &HeaderMap) -> Result<User, AuthError> {
        let value = match headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedCredential)?),
            None => None,
        };
        self.resolve(value).await
    }
}

/// Split `<scheme> <token>` and return the token of a bearer credential.
///
/// The scheme is compared case-insensitively. The token may be empty; an empty
/// token never validates.
///
/// # Errors
/// `MissingCredential` for `None`, `MalformedCredential` when there is no
/// separator, `UnsupportedScheme` for any scheme other than bearer.
pub fn parse_bearer(authorization: Option<&str>) -> Result<&str, AuthError> {
    let value = authorization.ok_or(AuthError::MissingCredential)?;
    let (scheme, token) = value
        .trim_start()
        .split_once(' ')
        .ok_or(AuthError::MalformedCredential)?;
    if scheme.is_empty() {
        return Err(AuthError::MalformedCredential);
    }
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(AuthError::UnsupportedScheme);
    }
    Ok(token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{clock::ManualClock, session::DEFAULT_SESSION_TTL_SECONDS};
    use crate::store::{DocumentStore, MemoryStore, date_value};
    use axum::http::HeaderValue;
    use chrono::{Duration, Utc};
    use serde_json::json;

    #[test]
    fn parse_bearer_cases() {
        assert!(matches!(parse_bearer(None), Err(AuthError::MissingCredential)));
        assert!(matches!(
            parse_bearer(Some("Bearer")),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            parse_bearer(Some("")),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            parse_bearer(Some("Token abc")),
            Err(AuthError::UnsupportedScheme)
        ));
        assert!(matches!(parse_bearer(Some("Bearer ")), Ok("")));
        assert!(matches!(parse_bearer(Some("bearer abc")), Ok("abc")));
        assert!(matches!(parse_bearer(Some("BEARER   abc ")), Ok("abc")));
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        sessions: Arc<SessionManager>,
        resolver: IdentityResolver,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            clock.clone(),
            Duration::seconds(DEFAULT_SESSION_TTL_SECONDS),
        ));
        let resolver = IdentityResolver::new(Arc::clone(&sessions), store.clone());
        Fixture {
            store,
            clock,
            sessions,
            resolver,
        }
    }

    async fn insert_user(store: &MemoryStore) -> anyhow::Result<String> {
        let now = Utc::now();
        let Some(record) = json!({
            "name": "Ana",
            "email": "ana@example.com",
            "password_hash": "x",
            "password_salt": "y",
            "created_at": date_value(now),
            "updated_at": date_value(now),
        })
        .as_object()
        .cloned() else {
            anyhow::bail!("fixture is not an object");
        };
        Ok(store.create(USER_COLLECTION, &record).await?)
    }

    #[tokio::test]
    async fn resolves_live_session_to_user() -> anyhow::Result<()> {
        let fx = fixture();
        let user_id = insert_user(&fx.store).await?;
        let token = fx.sessions.issue(&user_id).await?;

        let user = fx.resolver.resolve(Some(&format!("Bearer {token}"))).await?;
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "ana@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn header_failures_map_to_distinct_errors() {
        let fx = fixture();
        assert!(matches!(
            fx.resolver.resolve(None).await,
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            fx.resolver.resolve(Some("Token abc")).await,
            Err(AuthError::UnsupportedScheme)
        ));
        assert!(matches!(
            fx.resolver.resolve(Some("Bearer ")).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            fx.resolver.resolve(Some("Bearer nope")).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn expired_session_is_invalid_token() -> anyhow::Result<()> {
        let fx = fixture();
        let user_id = insert_user(&fx.store).await?;
        let token = fx.sessions.issue(&user_id).await?;

        fx.clock.advance(Duration::days(8));
        assert!(matches!(
            fx.resolver.resolve(Some(&format!("Bearer {token}"))).await,
            Err(AuthError::InvalidToken)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn session_for_missing_user_is_user_not_found() -> anyhow::Result<()> {
        let fx = fixture();
        let token = fx.sessions.issue("ghost").await?;

        assert!(matches!(
            fx.resolver.resolve(Some(&format!("Bearer {token}"))).await,
            Err(AuthError::UserNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn resolve_headers_rejects_non_text_values() -> anyhow::Result<()> {
        let fx = fixture();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff")?);

        assert!(matches!(
            fx.resolver.resolve_headers(&headers).await,
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            fx.resolver.resolve_headers(&HeaderMap::new()).await,
            Err(AuthError::MissingCredential)
        ));
        Ok(())
    }
}
