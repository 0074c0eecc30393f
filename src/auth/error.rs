use thiserror::Error;

use crate::store::StoreError;

/// Failures of the authentication subsystem.
///
/// `InvalidInput`, `DuplicateEmail` and `InvalidCredentials` are client errors;
/// the credential variants (`MissingCredential` through `UserNotFound`) are all
/// reported to callers as the same unauthorized response; `Store` and `Crypto`
/// are infrastructure failures; `Config` is a startup or settings error.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("missing authorization header")]
    MissingCredential,

    #[error("malformed authorization header")]
    MalformedCredential,

    #[error("unsupported authorization scheme")]
    UnsupportedScheme,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("session user not found")]
    UserNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error("invalid auth configuration: {0}")]
    Config(String),
}

impl AuthError {
    /// True for failures that resolve to "request is not authenticated".
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential
                | Self::MalformedCredential
                | Self::UnsupportedScheme
                | Self::InvalidToken
                | Self::UserNotFound
        )
    }

    /// True for failures caused by the store or the system RNG.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Crypto(_))
    }
}
