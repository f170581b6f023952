//! Session store migrations.
//!
//! The storefront keeps only sessions in `PostgreSQL`; everything else lives
//! in the commerce backend. This creates the `tower_sessions` schema and
//! table used by `PostgresStore`.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use harbor_storefront::config::{ConfigError, database_url_from_env};
use harbor_storefront::db::create_pool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create the session table if it does not exist.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the migration fails.
pub async fn sessions() -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();

    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to session database...");
    let pool = create_pool(&database_url).await?;

    tracing::info!("Running session store migrations...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session store migrations complete!");
    Ok(())
}
