//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! charret-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SITE_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! Migration files live in `crates/site/migrations/`.

use super::CliError;

/// Run the site database migrations.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../site/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
