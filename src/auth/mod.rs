//! Authentication and session management.
//!
//! - `credentials`: salted password digests and constant-time verification.
//! - `session`: opaque bearer tokens, persisted by hash, with lazy expiry.
//! - `identity`: `Authorization` header parsing and user resolution.
//! - `account`: registration and login built on the three above.
//!
//! All persistence goes through the injected [`crate::store::DocumentStore`].

mod account;
pub mod clock;
pub mod credentials;
mod error;
pub mod identity;
pub mod models;
pub mod session;
mod state;
mod utils;

pub use account::{AuthSession, Accounts};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialManager, PasswordDigest, PasswordScheme};
pub use error::AuthError;
pub use identity::{IdentityResolver, parse_bearer};
pub use models::{PublicUser, SessionRecord, SessionState, User};
pub use session::{DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS, SessionManager};
pub use state::{AuthConfig, AuthState};
