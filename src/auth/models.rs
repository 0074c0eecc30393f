//! Records persisted by the auth subsystem and their public projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::credentials::PasswordScheme;
use crate::store::date;

pub const USER_COLLECTION: &str = "user";
pub const SESSION_COLLECTION: &str = "session";

/// A registered account as stored.
#[derive(Clone, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    #[serde(default)]
    pub password_scheme: PasswordScheme,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(with = "date")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "date")]
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("password_salt", &"***")
            .field("password_scheme", &self.password_scheme)
            .field("avatar_url", &self.avatar_url)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Insert shape for a user; the store assigns the identifier.
#[derive(Serialize)]
pub(crate) struct NewUser<'a> {
    pub(crate) name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) password_hash: &'a str,
    pub(crate) password_salt: &'a str,
    pub(crate) password_scheme: PasswordScheme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) avatar_url: Option<&'a str>,
    #[serde(with = "date")]
    pub(crate) created_at: DateTime<Utc>,
    #[serde(with = "date")]
    pub(crate) updated_at: DateTime<Utc>,
}

/// User fields safe to return to clients.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Lifecycle of a session: `Active` until expiry, then `Expired` for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expired,
}

/// One login, bound to a user by reference. Only the token hash is stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub token_hash: String,
    #[serde(with = "date")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "date")]
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if now >= self.expires_at {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Document, INTERNAL_ID_FIELD, date_value, from_document, serialize};
    use anyhow::Result;
    use chrono::Duration;
    use serde_json::json;

    fn stored_user() -> Document {
        let now = Utc::now();
        let mut record = Document::new();
        record.insert(INTERNAL_ID_FIELD.to_string(), json!("u-1"));
        record.insert("name".to_string(), json!("Ana"));
        record.insert("email".to_string(), json!("ana@example.com"));
        record.insert("password_hash".to_string(), json!("abcd"));
        record.insert("password_salt".to_string(), json!("0011"));
        record.insert("created_at".to_string(), date_value(now));
        record.insert("updated_at".to_string(), date_value(now));
        record
    }

    #[test]
    fn user_decodes_without_scheme_tag_as_sha256() -> Result<()> {
        let user: User = from_document(USER_COLLECTION, stored_user())?;
        assert_eq!(user.id, "u-1");
        assert_eq!(user.password_scheme, PasswordScheme::Sha256);
        assert_eq!(user.avatar_url, None);
        Ok(())
    }

    #[test]
    fn user_decodes_from_serialized_form() -> Result<()> {
        let user: User = from_document(USER_COLLECTION, serialize(&stored_user()))?;
        assert_eq!(user.id, "u-1");
        Ok(())
    }

    #[test]
    fn public_user_omits_credentials() -> Result<()> {
        let user: User = from_document(USER_COLLECTION, stored_user())?;
        let value = serde_json::to_value(PublicUser::from(&user))?;

        assert_eq!(
            value,
            json!({"id": "u-1", "name": "Ana", "email": "ana@example.com"})
        );
        Ok(())
    }

    #[test]
    fn user_debug_redacts_credentials() -> Result<()> {
        let user: User = from_document(USER_COLLECTION, stored_user())?;
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("abcd"));
        assert!(rendered.contains("ana@example.com"));
        Ok(())
    }

    #[test]
    fn session_expires_exactly_at_expiry() {
        let now = Utc::now();
        let session = SessionRecord {
            user_id: "u-1".to_string(),
            token_hash: "h".to_string(),
            created_at: now,
            expires_at: now + Duration::days(7),
        };

        assert_eq!(session.state_at(now), SessionState::Active);
        assert_eq!(
            session.state_at(now + Duration::days(7) - Duration::milliseconds(1)),
            SessionState::Active
        );
        assert_eq!(session.state_at(now + Duration::days(7)), SessionState::Expired);
    }
}
