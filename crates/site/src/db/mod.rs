//! Database operations for the site's `PostgreSQL` store.
//!
//! # Tables
//!
//! - `menu_categories` / `menu_items` - The published menu
//! - `customers` - One row per submitted checkout (no accounts)
//! - `orders` / `order_items` - Submitted orders and their line snapshots
//! - `admin_users` - Back-office logins
//! - `business_hours` / `site_settings` - Opening hours and operational knobs
//! - `sessions` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/site/migrations/` and run via:
//! ```bash
//! cargo run -p charret-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod admins;
pub mod menu;
pub mod orders;
pub mod settings;

pub use admins::{AdminRepository, AdminUser};
pub use menu::{MenuCategory, MenuItem, MenuItemUpdate, MenuRepository};
pub use orders::{
    DashboardStats, OrderConfirmation, OrderItemRow, OrderRepository, OrderSummary,
};
pub use settings::{BusinessHour, HoursUpdate, SettingsRepository, SiteSettings};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness or state conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be interpreted.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
