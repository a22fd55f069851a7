//! Menu repository: read access for the published menu.
//!
//! Customer-facing queries only return items with `is_available = true`,
//! ordered by the category's sort order. The admin board can flip
//! availability without deleting rows.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use charret_core::{CategoryId, MenuItemId};

use super::RepositoryError;

/// A menu category (e.g. "Platos", "Postres").
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MenuCategory {
    pub id: CategoryId,
    pub name: String,
    pub sort_order: i32,
}

/// A single orderable menu item.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in pesos.
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub is_special: bool,
}

/// Editable fields of a menu item, as submitted from the back office.
#[derive(Debug, Clone)]
pub struct MenuItemUpdate {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_special: bool,
}

/// Repository for menu reads and back-office edits.
pub struct MenuRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MenuRepository<'a> {
    /// Create a new menu repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<MenuCategory>, RepositoryError> {
        let categories = sqlx::query_as::<_, MenuCategory>(
            r"
            SELECT id, name, sort_order
            FROM menu_categories
            ORDER BY sort_order, name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// All available items, ordered by category sort order then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_available_items(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        let items = sqlx::query_as::<_, MenuItem>(
            r"
            SELECT i.id, i.category_id, i.name, i.description, i.price,
                   i.image_url, i.is_available, i.is_special
            FROM menu_items i
            JOIN menu_categories c ON c.id = i.category_id
            WHERE i.is_available = TRUE
            ORDER BY c.sort_order, i.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Every item regardless of availability, for the back-office menu
    /// screen. Same ordering as the public listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all_items(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        let items = sqlx::query_as::<_, MenuItem>(
            r"
            SELECT i.id, i.category_id, i.name, i.description, i.price,
                   i.image_url, i.is_available, i.is_special
            FROM menu_items i
            JOIN menu_categories c ON c.id = i.category_id
            ORDER BY c.sort_order, i.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Up to `limit` available specials for the home page banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn specials(&self, limit: i64) -> Result<Vec<MenuItem>, RepositoryError> {
        let items = sqlx::query_as::<_, MenuItem>(
            r"
            SELECT id, category_id, name, description, price,
                   image_url, is_available, is_special
            FROM menu_items
            WHERE is_special = TRUE AND is_available = TRUE
            ORDER BY name
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Look up a single available item, e.g. before adding it to a cart.
    ///
    /// Unavailable items are treated as absent so a stale add-to-cart form
    /// cannot order something the kitchen has pulled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_available(
        &self,
        id: MenuItemId,
    ) -> Result<Option<MenuItem>, RepositoryError> {
        let item = sqlx::query_as::<_, MenuItem>(
            r"
            SELECT id, category_id, name, description, price,
                   image_url, is_available, is_special
            FROM menu_items
            WHERE id = $1 AND is_available = TRUE
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// Flip an item's availability flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_availability(
        &self,
        id: MenuItemId,
        is_available: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE menu_items
            SET is_available = $1
            WHERE id = $2
            ",
        )
        .bind(is_available)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Rewrite an item's editable fields. Availability is handled
    /// separately by [`Self::set_availability`], and historical order lines
    /// are untouched because they snapshot name and price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_item(
        &self,
        id: MenuItemId,
        update: &MenuItemUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE menu_items
            SET name = $1, description = $2, price = $3,
                image_url = $4, is_special = $5
            WHERE id = $6
            ",
        )
        .bind(&update.name)
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.image_url.as_deref())
        .bind(update.is_special)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
