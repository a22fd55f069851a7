//! Menu seeding command.
//!
//! Inserts the house menu (categories plus dishes) so a fresh database has
//! something to sell. Idempotent: existing categories and items are left
//! alone, matching on name.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::CliError;

struct Dish {
    name: &'static str,
    description: &'static str,
    price: i64,
    image_url: Option<&'static str>,
    is_special: bool,
}

struct Category {
    name: &'static str,
    sort_order: i32,
    dishes: &'static [Dish],
}

const MENU: &[Category] = &[
    Category {
        name: "Platos",
        sort_order: 1,
        dishes: &[
            Dish {
                name: "Locro de La Fonda",
                description: "Guiso tradicional con maíz, porotos y carne, cocido a fuego lento",
                price: 10_500,
                image_url: Some(
                    "https://images.unsplash.com/photo-1547592166-23ac45744acd?q=80&w=600",
                ),
                is_special: true,
            },
            Dish {
                name: "Milanesa Napolitana",
                description: "Suprema de ternera, jamón, salsa y mozzarella gratinada",
                price: 21_000,
                image_url: Some(
                    "https://images.unsplash.com/photo-1632778149955-e80f8ceca2e8?q=80&w=600",
                ),
                is_special: false,
            },
            Dish {
                name: "Asado Criollo",
                description: "Cortes selectos a la parrilla con chimichurri casero",
                price: 28_000,
                image_url: Some(
                    "https://images.unsplash.com/photo-1558030006-450675393462?q=80&w=600",
                ),
                is_special: false,
            },
            Dish {
                name: "Pastas Caseras",
                description: "Ñoquis, ravioles y tallarines con salsas de autor",
                price: 9_000,
                image_url: Some(
                    "https://images.unsplash.com/photo-1473093295043-cdd812d0e601?q=80&w=600",
                ),
                is_special: false,
            },
        ],
    },
    Category {
        name: "Empanadas",
        sort_order: 2,
        dishes: &[Dish {
            name: "Empanadas Artesanales",
            description: "Selección de sabores: carne, pollo, humita y jamón y queso",
            price: 3_500,
            image_url: Some(
                "https://images.unsplash.com/photo-1604467794349-0b74285de7e7?q=80&w=600",
            ),
            is_special: true,
        }],
    },
    Category {
        name: "Parrilla El Galpón",
        sort_order: 3,
        dishes: &[
            Dish {
                name: "Parrillada para Dos",
                description: "Vacío, chorizo, morcilla y provoleta a las brasas",
                price: 38_000,
                image_url: Some(
                    "https://images.unsplash.com/photo-1529193591184-b1d58069ecdd?q=80&w=600",
                ),
                is_special: true,
            },
            Dish {
                name: "Choripán Criollo",
                description: "Chorizo a la parrilla en pan casero con chimichurri",
                price: 6_500,
                image_url: None,
                is_special: false,
            },
        ],
    },
    Category {
        name: "Postres",
        sort_order: 4,
        dishes: &[Dish {
            name: "Postres del Día",
            description: "Flan casero, tiramisú o especialidades de temporada",
            price: 7_000,
            image_url: Some(
                "https://images.unsplash.com/photo-1488477181946-6428a0291777?q=80&w=600",
            ),
            is_special: false,
        }],
    },
];

/// Seed the menu tables.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or an insert fails.
pub async fn menu() -> Result<(), CliError> {
    let pool = super::connect().await?;

    let mut inserted = 0usize;
    for category in MENU {
        let category_id = upsert_category(&pool, category).await?;
        for dish in category.dishes {
            if insert_dish(&pool, category_id, dish).await? {
                inserted += 1;
            }
        }
    }

    tracing::info!("Menu seeded ({inserted} new items)");
    Ok(())
}

async fn upsert_category(pool: &PgPool, category: &Category) -> Result<i32, CliError> {
    let id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO menu_categories (name, sort_order)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET sort_order = EXCLUDED.sort_order
        RETURNING id
        ",
    )
    .bind(category.name)
    .bind(category.sort_order)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Insert a dish unless one with the same name already exists in the
/// category. Returns whether a row was inserted.
async fn insert_dish(pool: &PgPool, category_id: i32, dish: &Dish) -> Result<bool, CliError> {
    let exists = sqlx::query_scalar::<_, bool>(
        r"
        SELECT EXISTS (
            SELECT 1 FROM menu_items WHERE category_id = $1 AND name = $2
        )
        ",
    )
    .bind(category_id)
    .bind(dish.name)
    .fetch_one(pool)
    .await?;

    if exists {
        return Ok(false);
    }

    sqlx::query(
        r"
        INSERT INTO menu_items (category_id, name, description, price, image_url, is_special)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(category_id)
    .bind(dish.name)
    .bind(dish.description)
    .bind(Decimal::from(dish.price))
    .bind(dish.image_url)
    .bind(dish.is_special)
    .execute(pool)
    .await?;

    Ok(true)
}
