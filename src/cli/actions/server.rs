use crate::{
    api,
    auth::{AuthConfig, AuthState, PasswordScheme, SystemClock},
    store::{MemoryStore, PostgresStore, SharedStore},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub session_ttl_seconds: i64,
    pub password_scheme: PasswordScheme,
    pub cors_allow_origin: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store: SharedStore = match &args.dsn {
        Some(dsn) => {
            let store = PostgresStore::connect(dsn)
                .await
                .context("Failed to connect to database")?;
            store
                .apply_schema()
                .await
                .context("Failed to apply database schema")?;
            info!("Using PostgreSQL document store");
            Arc::new(store)
        }
        None => {
            warn!("No DSN configured, records are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let auth_config = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_password_scheme(args.password_scheme);
    info!(
        "Sessions valid for {}s, new passwords use {}",
        auth_config.session_ttl_seconds(),
        auth_config.password_scheme()
    );

    let auth_state = AuthState::new(auth_config, Arc::clone(&store), Arc::new(SystemClock))
        .context("Invalid auth configuration")?;

    api::new(args.port, store, auth_state, &args.cors_allow_origin).await
}
