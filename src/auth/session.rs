//! Session issuance and expiry-aware validation.
//!
//! Expiry is evaluated when a token is presented; nothing deletes expired
//! sessions, they simply stop validating.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{
    AuthError,
    clock::Clock,
    models::{SESSION_COLLECTION, SessionRecord, SessionState},
    utils::{generate_session_token, hash_session_token},
};
use crate::store::{Filter, SharedStore, find_one, to_document};

/// Default validity window: 7 days.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Longest accepted validity window: 10 years.
pub const MAX_SESSION_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Insert attempts before giving up on a colliding token hash.
const TOKEN_ATTEMPTS: usize = 3;

pub struct SessionManager {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `user_id` and persist its session.
    ///
    /// # Errors
    /// Returns a store error, [`AuthError::Crypto`] if no unique token could
    /// be generated, or [`AuthError::Config`] if the expiry is not representable.
    #[instrument(skip(self))]
    pub async fn issue(&self, user_id: &str) -> Result<String, AuthError> {
        for _ in 0..TOKEN_ATTEMPTS {
            let token = generate_session_token()?;
            let now = self.clock.now();
            let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
                AuthError::Config(format!(
                    "session ttl {}s overflows the clock",
                    self.ttl.num_seconds()
                ))
            })?;
            let record = SessionRecord {
                user_id: user_id.to_string(),
                token_hash: hash_session_token(&token),
                created_at: now,
                expires_at,
            };
            let document = to_document(SESSION_COLLECTION, &record)?;

            match self.store.create(SESSION_COLLECTION, &document).await {
                Ok(_) => {
                    debug!("session issued");
                    return Ok(token);
                }
                Err(err) if err.is_duplicate_key("token_hash") => {
                    warn!("session token collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AuthError::Crypto(
            "failed to generate unique session token".to_string(),
        ))
    }

    /// Resolve `token` to the owning user id.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] when no session matches or the
    /// session has expired, or a store error.
    pub async fn validate(&self, token: &str) -> Result<String, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let filter = Filter::new().eq("token_hash", hash_session_token(token));
        let Some(session) =
            find_one::<SessionRecord>(self.store.as_ref(), SESSION_COLLECTION, &filter).await?
        else {
            debug!("no session for presented token");
            return Err(AuthError::InvalidToken);
        };

        match session.state_at(self.clock.now()) {
            SessionState::Active => Ok(session.user_id),
            SessionState::Expired => {
                debug!("session expired at {}", session.expires_at);
                Err(AuthError::InvalidToken)
            }
        }
    }
}
