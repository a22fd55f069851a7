//! Admin user repository for back-office logins.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use charret_core::AdminUserId;

use super::RepositoryError;

/// A back-office user row, including the argon2 password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for admin user lookups and creation.
pub struct AdminRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepository<'a> {
    /// Create a new admin repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up an admin by email for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<AdminUser>, RepositoryError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            r"
            SELECT id, email, name, password_hash, created_at
            FROM admin_users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(admin)
    }

    /// Create an admin user (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            r"
            INSERT INTO admin_users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, created_at
            ",
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(admin)
    }
}
