//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The whole cart lives in the session; every mutation loads it, applies
//! one cart-store operation, and saves it back.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use charret_core::MenuItemId;

use crate::cart::{self, Cart};
use crate::error::{AppError, Result};
use crate::filters;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub line_total: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total_items: u32,
    pub total_price: Decimal,
    pub is_open: bool,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartItemView {
                    id: item.id.as_i32(),
                    name: item.name.clone(),
                    price: item.price,
                    line_total: item.subtotal(),
                    quantity: item.quantity,
                    image_url: item.image_url.clone(),
                })
                .collect(),
            total_items: cart.total_items(),
            total_price: cart.total_price(),
            is_open: cart.is_open,
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub item_id: i32,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: i32,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: i32,
}

/// Toggle panel form data.
#[derive(Debug, Deserialize)]
pub struct ToggleCartForm {
    pub open: bool,
}

/// Cart panel fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_panel.html")]
pub struct CartPanelTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Add one unit of a menu item to the cart (HTMX).
///
/// The item is looked up fresh so the cart snapshots the current price and
/// a pulled item cannot be added from a stale page.
/// Returns an HTMX trigger to update the cart count badge.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let item_id = MenuItemId::new(form.item_id);
    let item = crate::db::MenuRepository::new(state.pool())
        .get_available(item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("menu item {item_id}")))?;

    let mut cart = cart::load(&session).await;
    cart.add_item(item.id, &item.name, item.price, item.image_url.as_deref());
    cart::save(&session, &cart).await?;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartCountTemplate {
            count: cart.total_items(),
        },
    )
        .into_response())
}

/// Set a cart line's quantity (HTMX). A quantity of 0 removes the line.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut cart = cart::load(&session).await;
    cart.update_quantity(MenuItemId::new(form.item_id), form.quantity);
    cart::save(&session, &cart).await?;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartPanelTemplate {
            cart: CartView::from(&cart),
        },
    )
        .into_response())
}

/// Remove a line from the cart (HTMX).
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut cart = cart::load(&session).await;
    cart.remove_item(MenuItemId::new(form.item_id));
    cart::save(&session, &cart).await?;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartPanelTemplate {
            cart: CartView::from(&cart),
        },
    )
        .into_response())
}

/// Open or close the cart panel (HTMX).
#[instrument(skip(session))]
pub async fn toggle(
    session: Session,
    Form(form): Form<ToggleCartForm>,
) -> Result<Response> {
    let mut cart = cart::load(&session).await;
    cart.set_open(form.open);
    cart::save(&session, &cart).await?;

    Ok(CartPanelTemplate {
        cart: CartView::from(&cart),
    }
    .into_response())
}

/// Get the cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    let cart = cart::load(&session).await;
    CartCountTemplate {
        count: cart.total_items(),
    }
}
