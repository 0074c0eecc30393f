//! Salted password hashing and verification.
//!
//! The default `sha256` scheme computes `hex(SHA-256(salt || password))` where
//! `salt` is the hex text stored on the user record. It is a fast digest and
//! kept only so existing credential records stay valid; `argon2id` can be
//! enabled for new registrations and is selected per record through the
//! `password_scheme` tag.

use argon2::Argon2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};
use tracing::warn;

use super::{
    AuthError,
    utils::{constant_time_eq, random_bytes},
};

/// Salt length in bytes (128 bits) before hex encoding.
pub const SALT_BYTES: usize = 16;

const ARGON2_OUTPUT_BYTES: usize = 32;

/// Credential format tag stored next to the digest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    #[default]
    Sha256,
    Argon2id,
}

impl PasswordScheme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Argon2id => "argon2id",
        }
    }
}

impl fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordScheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "argon2id" | "argon2" => Ok(Self::Argon2id),
            other => Err(format!("unknown password scheme: {other}")),
        }
    }
}

/// Digest and the salt it was computed with, both hex text.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub digest: String,
    pub salt: String,
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordDigest")
            .field("digest", &"***")
            .field("salt", &"***")
            .finish()
    }
}

/// Hashes new passwords with one scheme and verifies any supported scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct CredentialManager {
    scheme: PasswordScheme,
}

impl CredentialManager {
    #[must_use]
    pub fn new(scheme: PasswordScheme) -> Self {
        Self { scheme }
    }

    #[must_use]
    pub fn scheme(&self) -> PasswordScheme {
        self.scheme
    }

    /// Hash `password` with the configured scheme.
    ///
    /// A fresh random salt is generated when `salt` is `None`.
    ///
    /// # Errors
    /// Returns [`AuthError::Crypto`] if the random source or the hash fails.
    pub fn hash(&self, password: &str, salt: Option<&str>) -> Result<PasswordDigest, AuthError> {
        hash_password(self.scheme, password, salt)
    }

    /// Check `password` against a stored credential record.
    #[must_use]
    pub fn verify(
        &self,
        password: &str,
        scheme: PasswordScheme,
        stored_salt: &str,
        stored_digest: &str,
    ) -> bool {
        verify_password(scheme, password, stored_salt, stored_digest)
    }
}

/// # Errors
/// Returns [`AuthError::Crypto`] if the random source or the hash fails.
pub fn hash_password(
    scheme: PasswordScheme,
    password: &str,
    salt: Option<&str>,
) -> Result<PasswordDigest, AuthError> {
    let salt = match salt {
        Some(salt) => salt.to_string(),
        None => generate_salt()?,
    };
    let digest = compute_digest(scheme, password, &salt)?;
    Ok(PasswordDigest { digest, salt })
}

#[must_use]
pub fn verify_password(
    scheme: PasswordScheme,
    password: &str,
    stored_salt: &str,
    stored_digest: &str,
) -> bool {
    match compute_digest(scheme, password, stored_salt) {
        Ok(candidate) => constant_time_eq(
            candidate.as_bytes(),
            stored_digest.to_ascii_lowercase().as_bytes(),
        ),
        Err(err) => {
            warn!("Failed to recompute password digest: {err}");
            false
        }
    }
}

pub(crate) fn generate_salt() -> Result<String, AuthError> {
    Ok(hex::encode(random_bytes::<SALT_BYTES>()?))
}

fn compute_digest(scheme: PasswordScheme, password: &str, salt: &str) -> Result<String, AuthError> {
    match scheme {
        PasswordScheme::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(salt.as_bytes());
            hasher.update(password.as_bytes());
            Ok(hex::encode(hasher.finalize()))
        }
        PasswordScheme::Argon2id => {
            // Salts written by this service are hex; anything else is used verbatim.
            let salt_bytes = hex::decode(salt).unwrap_or_else(|_| salt.as_bytes().to_vec());
            let mut output = [0u8; ARGON2_OUTPUT_BYTES];
            Argon2::default()
                .hash_password_into(password.as_bytes(), &salt_bytes, &mut output)
                .map_err(|err| AuthError::Crypto(format!("argon2 failed: {err}")))?;
            Ok(hex::encode(output))
        }
    }
}
