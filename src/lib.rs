//! # Tripmate (Community Travel Matching)
//!
//! `tripmate` is the backend for a community travel-matching platform: users
//! post trips, apply to join them, list and review guides, and share posts on
//! a community feed.
//!
//! ## Document Store
//!
//! Every record lives in a named collection of a document store (`user`,
//! `session`, `trip`, `application`, `guide`, `review`, `feedpost`). The store
//! is an injected capability ([`store::DocumentStore`]) with an in-memory
//! backend and a PostgreSQL (JSONB) backend. Records leaving the API are always
//! passed through [`store::serialize`], which exposes the identifier as `id`
//! and renders timestamps as ISO-8601 text.
//!
//! ## Authentication
//!
//! - **Credentials:** salted SHA-256 digests by default, `argon2id` opt-in per
//!   record via the `password_scheme` tag. Digests are compared in constant time.
//! - **Sessions:** 256-bit opaque bearer tokens, valid for 7 days. Only the
//!   SHA-256 hash of a token is stored. Expiry is evaluated lazily at
//!   validation time; expired sessions are never purged by the service.
//! - **Identity:** protected routes resolve `Authorization: Bearer <token>` to a
//!   user. Every authentication failure is reported as the same `401` so callers
//!   cannot tell the reasons apart.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
