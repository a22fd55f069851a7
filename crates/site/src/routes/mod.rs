//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Menu home page
//! GET  /health                  - Health check
//! GET  /health/ready            - Readiness check (database ping)
//!
//! # Cart (HTMX fragments)
//! POST /cart/add                - Add a menu item (returns count fragment)
//! POST /cart/update             - Set a line quantity (returns panel fragment)
//! POST /cart/remove             - Remove a line (returns panel fragment)
//! POST /cart/toggle             - Open/close the panel (returns panel fragment)
//! GET  /cart/count              - Cart count badge (fragment)
//!
//! # Checkout wizard
//! GET  /checkout                - Current step
//! POST /checkout/modality       - Select fulfillment modality
//! POST /checkout/customer       - Save customer data
//! POST /checkout/payment        - Select payment method
//! POST /checkout/next           - Advance (guarded)
//! POST /checkout/previous       - Go back (exits from step 1)
//! POST /checkout/confirm        - Submit the order
//! GET  /order-success           - Confirmation page
//!
//! # Back office (requires admin login)
//! GET  /admin/login             - Login page
//! POST /admin/login             - Login action
//! POST /admin/logout            - Logout action
//! GET  /admin                   - Dashboard
//! GET  /admin/orders            - Order board
//! GET  /admin/orders/{id}       - Order detail fragment (HTMX)
//! POST /admin/orders/{id}/status - Status transition
//! GET  /admin/menu              - Menu management screen
//! POST /admin/menu/{id}         - Edit a menu item
//! POST /admin/menu/{id}/availability - Toggle menu item availability
//! GET  /admin/hours             - Opening-hours screen
//! POST /admin/hours/{day}       - Replace one weekday's hours
//! GET  /admin/settings          - Settings screen
//! POST /admin/settings          - Save settings
//! GET  /admin/events            - Order-change SSE stream
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/toggle", post(cart::toggle))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/modality", post(checkout::set_modality))
        .route("/customer", post(checkout::set_customer))
        .route("/payment", post(checkout::set_payment))
        .route("/next", post(checkout::next))
        .route("/previous", post(checkout::back))
        .route("/confirm", post(checkout::confirm))
}

/// Create the back-office routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(admin::login_page).post(admin::login))
        .route("/logout", post(admin::logout))
        .route("/", get(admin::dashboard))
        .route("/orders", get(admin::orders_board))
        .route("/orders/{id}", get(admin::order_detail))
        .route("/orders/{id}/status", post(admin::update_status))
        .route("/menu", get(admin::menu_page))
        .route("/menu/{id}", post(admin::update_menu_item))
        .route("/menu/{id}/availability", post(admin::set_menu_availability))
        .route("/hours", get(admin::hours_page))
        .route("/hours/{day}", post(admin::update_hours))
        .route("/settings", get(admin::settings_page).post(admin::update_settings))
        .route("/events", get(admin::events))
}

/// Create the complete application router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/order-success", get(orders::success))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/admin", admin_routes())
}
