//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository error.
    #[error("{0}")]
    Repository(#[from] charret_site::db::RepositoryError),

    /// Password hashing error.
    #[error("{0}")]
    Auth(#[from] charret_site::services::auth::AuthError),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Connect to the site database using `SITE_DATABASE_URL` (with a
/// `DATABASE_URL` fallback).
pub(crate) async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("SITE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("SITE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = charret_site::db::create_pool(&database_url).await?;
    Ok(pool)
}
