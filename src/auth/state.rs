use chrono::TimeDelta;
use std::sync::Arc;

use super::{
    account::Accounts,
    clock::Clock,
    credentials::{CredentialManager, PasswordScheme},
    identity::IdentityResolver,
    error::AuthError,
    session::{DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS, SessionManager},
};
use crate::store::SharedStore;

/// Tunables of the auth subsystem.
#[derive(Clone, Copy, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    password_scheme: PasswordScheme,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            password_scheme: PasswordScheme::default(),
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_password_scheme(mut self, scheme: PasswordScheme) -> Self {
        self.password_scheme = scheme;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn password_scheme(&self) -> PasswordScheme {
        self.password_scheme
    }
}

/// Everything the HTTP layer needs to authenticate requests, built once at startup.
#[derive(Clone)]
pub struct AuthState {
    pub accounts: Arc<Accounts>,
    pub resolver: Arc<IdentityResolver>,
    pub sessions: Arc<SessionManager>,
}

impl AuthState {
    /// Wire the auth components around one store and clock.
    ///
    /// # Errors
    /// Returns [`AuthError::Config`] if the session ttl is outside
    /// `1..=MAX_SESSION_TTL_SECONDS`.
    pub fn new(
        config: AuthConfig,
        store: SharedStore,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let ttl = session_ttl(config.session_ttl_seconds)?;
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            ttl,
        ));
        let accounts = Arc::new(Accounts::new(
            Arc::clone(&store),
            CredentialManager::new(config.password_scheme),
            Arc::clone(&sessions),
            clock,
        ));
        let resolver = Arc::new(IdentityResolver::new(Arc::clone(&sessions), store));

        Ok(Self {
            accounts,
            resolver,
            sessions,
        })
    }
}

fn session_ttl(seconds: i64) -> Result<TimeDelta, AuthError> {
    if !(1..=MAX_SESSION_TTL_SECONDS).contains(&seconds) {
        return Err(AuthError::Config(format!(
            "session ttl must be between 1 and {MAX_SESSION_TTL_SECONDS} seconds, got {seconds}"
        )));
    }
    TimeDelta::try_seconds(seconds)
        .ok_or_else(|| AuthError::Config(format!("session ttl out of range: {seconds}")))
}
