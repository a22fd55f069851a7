//! Back-office user management commands.
//!
//! # Usage
//!
//! ```bash
//! charret-cli admin create -e admin@example.com -n "Admin Name"
//! ```
//!
//! The password comes from `--password` or, preferably, from the
//! `CHARRET_ADMIN_PASSWORD` environment variable so it stays out of shell
//! history.

use charret_site::db::AdminRepository;
use charret_site::services::auth::hash_password;

use super::CliError;

const MIN_PASSWORD_LENGTH: usize = 12;

/// Create a new back-office user.
///
/// # Errors
///
/// Returns `CliError` if the email or password is invalid, the email is
/// already registered, or the database write fails.
pub async fn create_user(
    email: &str,
    name: &str,
    password: Option<&str>,
) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    // Basic email validation
    if !email.contains('@') || !email.contains('.') {
        return Err(CliError::InvalidInput(format!("invalid email: {email}")));
    }

    let password = match password {
        Some(p) => p.to_owned(),
        None => std::env::var("CHARRET_ADMIN_PASSWORD")
            .map_err(|_| CliError::MissingEnvVar("CHARRET_ADMIN_PASSWORD"))?,
    };

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(CliError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let pool = super::connect().await?;
    let email = email.trim().to_lowercase();
    let password_hash = hash_password(&password)?;

    let admin = AdminRepository::new(&pool)
        .create(&email, name, &password_hash)
        .await?;

    tracing::info!("Admin user created: {} ({})", admin.email, admin.id);
    Ok(())
}
