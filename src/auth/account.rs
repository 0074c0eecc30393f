use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::{
    AuthError,
    clock::Clock,
    credentials::CredentialManager,
    models::{NewUser, PublicUser, USER_COLLECTION, User},
    session::SessionManager,
    utils::valid_email,
};
use crate::store::{Filter, SharedStore, find_one, to_document};

/// Token handed to the client plus the account it belongs to.
#[derive(ToSchema, Serialize, Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}

/// Registration and login.
pub struct Accounts {
    store: SharedStore,
    credentials: CredentialManager,
    sessions: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
}

impl Accounts {
    #[must_use]
    pub fn new(
        store: SharedStore,
        credentials: CredentialManager,
        sessions: Arc<SessionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            credentials,
            sessions,
            clock,
        }
    }

    /// Create an account and log it in.
    ///
    /// # Errors
    /// `InvalidInput` for a blank name, malformed email or empty password,
    /// `DuplicateEmail` if the email is taken, or an infrastructure error.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidInput("name must not be empty"));
        }
        if !valid_email(email) {
            return Err(AuthError::InvalidInput("invalid email"));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty"));
        }

        if self.find_by_email(email).await?.is_some() {
            debug!("registration rejected, email taken");
            return Err(AuthError::DuplicateEmail);
        }

        let digest = self.credentials.hash(password, None)?;
        let now = self.clock.now();
        let record = to_document(
            USER_COLLECTION,
            &NewUser {
                name,
                email,
                password_hash: &digest.digest,
                password_salt: &digest.salt,
                password_scheme: self.credentials.scheme(),
                avatar_url: None,
                created_at: now,
                updated_at: now,
            },
        )?;

        let id = match self.store.create(USER_COLLECTION, &record).await {
            Ok(id) => id,
            // lost the race against a concurrent registration
            Err(err) if err.is_duplicate_key("email") => return Err(AuthError::DuplicateEmail),
            Err(err) => return Err(err.into()),
        };

        // The account stays if no session can be issued; a retried register is
        // then `DuplicateEmail` and the client recovers through login.
        let token = self.sessions.issue(&id).await?;
        info!("registered user {id}");

        Ok(AuthSession {
            token,
            user: PublicUser {
                id,
                name: name.to_string(),
                email: email.to_string(),
                avatar_url: None,
            },
        })
    }

    /// Verify credentials and start a new session.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email or a wrong password, or an
    /// infrastructure error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let Some(user) = self.find_by_email(email.trim()).await? else {
            debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.credentials.verify(
            password,
            user.password_scheme,
            &user.password_salt,
            &user.password_hash,
        ) {
            debug!("login with wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.sessions.issue(&user.id).await?;
        Ok(AuthSession {
            token,
            user: PublicUser::from(&user),
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let filter = Filter::new().eq("email", email);
        Ok(find_one::<User>(self.store.as_ref(), USER_COLLECTION, &filter).await?)
    }
}
