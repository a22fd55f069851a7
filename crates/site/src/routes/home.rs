//! Home page: hero, the public menu, and the contact block.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use crate::cart;
use crate::db::{MenuItem, MenuRepository, SettingsRepository};
use crate::error::Result;
use crate::filters;
use crate::routes::cart::CartView;
use crate::state::AppState;

/// Menu item display data.
pub struct MenuItemView {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_special: bool,
}

/// One menu section with its items.
pub struct CategorySection {
    pub name: String,
    pub items: Vec<MenuItemView>,
}

/// One line of the opening-hours block.
pub struct HourLine {
    pub day: &'static str,
    pub schedule: String,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub specials: Vec<MenuItemView>,
    pub sections: Vec<CategorySection>,
    pub cart: CartView,
    pub phone: String,
    pub address: String,
    pub whatsapp_href: Option<String>,
    pub hours: Vec<HourLine>,
}

impl From<&MenuItem> for MenuItemView {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: item.id.as_i32(),
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
            image_url: item.image_url.clone(),
            is_special: item.is_special,
        }
    }
}

/// WhatsApp deep link for the configured phone, or `None` when no phone is
/// set. Keeps digits only; `wa.me` rejects formatted numbers.
fn whatsapp_link(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!(
        "https://wa.me/{digits}?text=Hola!%20Quiero%20hacer%20un%20pedido%20en%20Charret"
    ))
}

/// Render the landing page: hero, today's specials, the menu grouped by
/// category, and the contact block with live hours and settings.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let repo = MenuRepository::new(state.pool());
    let categories = repo.list_categories().await?;
    let items = repo.list_available_items().await?;
    let specials = repo.specials(3).await?;

    let settings_repo = SettingsRepository::new(state.pool());
    let settings = settings_repo.settings().await?;
    let hours = settings_repo.hours().await?;

    let sections = categories
        .iter()
        .map(|category| CategorySection {
            name: category.name.clone(),
            items: items
                .iter()
                .filter(|item| item.category_id == category.id)
                .map(MenuItemView::from)
                .collect(),
        })
        .filter(|section| !section.items.is_empty())
        .collect();

    let cart = cart::load(&session).await;

    Ok(HomeTemplate {
        specials: specials.iter().map(MenuItemView::from).collect(),
        sections,
        cart: CartView::from(&cart),
        whatsapp_href: whatsapp_link(&settings.restaurant_phone),
        phone: settings.restaurant_phone,
        address: settings.restaurant_address,
        hours: hours
            .iter()
            .map(|hour| HourLine {
                day: hour.day_label(),
                schedule: hour.schedule(),
            })
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_link_strips_formatting() {
        let href = whatsapp_link("+54 9 11 1234-5678").unwrap();
        assert!(href.starts_with("https://wa.me/5491112345678?"));
    }

    #[test]
    fn test_whatsapp_link_absent_without_phone() {
        assert_eq!(whatsapp_link(""), None);
        assert_eq!(whatsapp_link("a consultar"), None);
    }
}
