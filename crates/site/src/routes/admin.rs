//! Back-office routes: login, dashboard, and the live order board.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{
        IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tower_sessions::Session;
use tracing::instrument;

use charret_core::{MenuItemId, Modality, OrderId, OrderStatus, PaymentMethod};

use crate::db::{
    AdminRepository, BusinessHour, DashboardStats, HoursUpdate, MenuItem, MenuItemUpdate,
    MenuRepository, OrderRepository, OrderSummary, RepositoryError, SettingsRepository,
    SiteSettings,
};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::auth::{RequireAdmin, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::services::auth::verify_password;
use crate::state::AppState;

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Pendiente",
        OrderStatus::Preparing => "En preparación",
        OrderStatus::Ready => "Listo",
        OrderStatus::Delivered => "Entregado",
        OrderStatus::Cancelled => "Cancelado",
    }
}

fn modality_label(modality: Modality) -> &'static str {
    match modality {
        Modality::DineIn => "En el local",
        Modality::Pickup => "Retiro",
        Modality::Delivery => "Envío a domicilio",
    }
}

fn payment_label(payment: PaymentMethod) -> &'static str {
    match payment {
        PaymentMethod::MercadoPago => "Mercado Pago",
        PaymentMethod::Cash => "Efectivo",
    }
}

/// Order display data for board cards and the detail fragment.
pub struct OrderCardView {
    pub id: i32,
    pub order_number: i32,
    pub status: String,
    pub status_label: &'static str,
    pub modality_label: &'static str,
    pub payment_label: &'static str,
    pub total: Decimal,
    pub customer_name: String,
    pub customer_phone: String,
    pub created_time: String,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    /// The one allowed forward transition, as a form value plus label.
    pub next_status: Option<String>,
    pub next_status_label: Option<&'static str>,
    pub can_cancel: bool,
}

impl From<&OrderSummary> for OrderCardView {
    fn from(order: &OrderSummary) -> Self {
        Self {
            id: order.id.as_i32(),
            order_number: order.order_number,
            status: order.status.to_string(),
            status_label: status_label(order.status),
            modality_label: modality_label(order.modality),
            payment_label: payment_label(order.payment_method),
            total: order.total,
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            created_time: order.created_at.format("%d/%m %H:%M").to_string(),
            delivery_address: order.delivery_address.clone(),
            notes: order.notes.clone(),
            next_status: order.status.next().map(|s| s.to_string()),
            next_status_label: order.status.next().map(status_label),
            can_cancel: !order.status.is_terminal(),
        }
    }
}

/// One status tab on the board, with its filter value and active flag.
pub struct StatusTab {
    pub value: String,
    pub label: &'static str,
    pub active: bool,
}

/// Admin login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub error: bool,
}

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub admin_name: String,
    pub stats: DashboardStats,
    pub recent: Vec<OrderCardView>,
}

/// Admin order board template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersBoardTemplate {
    pub admin_name: String,
    pub tabs: Vec<StatusTab>,
    pub orders: Vec<OrderCardView>,
}

/// Order line display data for the detail fragment.
pub struct OrderLineView {
    pub name: String,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// Order detail fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/admin_order_detail.html")]
pub struct OrderDetailTemplate {
    pub order: OrderCardView,
    pub customer_email: Option<String>,
    pub lines: Vec<OrderLineView>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub has_delivery_fee: bool,
}

// =============================================================================
// Auth
// =============================================================================

/// Login page query parameters.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<u8>,
}

/// Render the login form.
#[instrument]
pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    AdminLoginTemplate {
        error: query.error.is_some(),
    }
}

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Verify credentials and start an admin session.
///
/// Unknown email and wrong password both land on the same generic error.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = form.email.trim().to_lowercase();
    let admin = AdminRepository::new(state.pool()).get_by_email(&email).await?;

    let Some(admin) = admin else {
        return Ok(Redirect::to("/admin/login?error=1").into_response());
    };

    if verify_password(&form.password, &admin.password_hash).is_err() {
        return Ok(Redirect::to("/admin/login?error=1").into_response());
    }

    set_current_admin(
        &session,
        &CurrentAdmin {
            id: admin.id,
            email: admin.email,
            name: admin.name,
        },
    )
    .await?;

    tracing::info!(admin_id = %admin.id, "Admin logged in");
    Ok(Redirect::to("/admin").into_response())
}

/// End the admin session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_admin(&session).await?;
    Ok(Redirect::to("/admin/login").into_response())
}

// =============================================================================
// Dashboard and board
// =============================================================================

/// Render the dashboard: today's totals and the latest orders.
#[instrument(skip(state, admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let repo = OrderRepository::new(state.pool());
    let stats = repo.dashboard_stats().await?;
    let recent = repo.recent(5).await?;

    Ok(DashboardTemplate {
        admin_name: admin.name,
        stats,
        recent: recent.iter().map(OrderCardView::from).collect(),
    })
}

/// Board query parameters.
#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    /// Status filter; absent or unparseable means "all".
    pub status: Option<String>,
}

/// Render the order board, optionally filtered to one status.
#[instrument(skip(state, admin))]
pub async fn orders_board(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse> {
    let filter = query
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok());

    let orders = OrderRepository::new(state.pool()).list(filter).await?;

    let mut tabs = vec![StatusTab {
        value: String::new(),
        label: "Todos",
        active: filter.is_none(),
    }];
    for status in OrderStatus::FLOW {
        tabs.push(StatusTab {
            value: status.to_string(),
            label: status_label(status),
            active: filter == Some(status),
        });
    }
    tabs.push(StatusTab {
        value: OrderStatus::Cancelled.to_string(),
        label: status_label(OrderStatus::Cancelled),
        active: filter == Some(OrderStatus::Cancelled),
    });

    Ok(OrdersBoardTemplate {
        admin_name: admin.name,
        tabs,
        orders: orders.iter().map(OrderCardView::from).collect(),
    })
}

/// Render one order's detail fragment (HTMX).
#[instrument(skip(state, _admin))]
pub async fn order_detail(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Response> {
    let order_id = OrderId::new(id);
    let repo = OrderRepository::new(state.pool());

    let order = repo
        .get(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    let items = repo.items_for(order_id).await?;

    Ok(OrderDetailTemplate {
        customer_email: order.customer_email.clone(),
        subtotal: order.subtotal,
        delivery_fee: order.delivery_fee,
        has_delivery_fee: order.delivery_fee > Decimal::ZERO,
        order: OrderCardView::from(&order),
        lines: items
            .into_iter()
            .map(|item| OrderLineView {
                name: item.name,
                quantity: item.quantity,
                subtotal: item.subtotal,
            })
            .collect(),
    }
    .into_response())
}

/// Status transition form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Apply a status transition from the board.
///
/// An out-of-graph transition (e.g. two admins racing on the same card)
/// comes back as a conflict; the board refetches and shows current state.
#[instrument(skip(state, _admin))]
pub async fn update_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let target: OrderStatus = form
        .status
        .parse()
        .map_err(crate::error::AppError::BadRequest)?;

    match OrderRepository::new(state.pool())
        .update_status(OrderId::new(id), target)
        .await
    {
        Ok(()) => Ok(Redirect::to("/admin/orders").into_response()),
        Err(RepositoryError::Conflict(reason)) => {
            tracing::warn!(order_id = id, "Rejected status transition: {reason}");
            Ok(Redirect::to("/admin/orders").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Menu management
// =============================================================================

/// Menu item display data for the back-office edit forms.
pub struct MenuItemFormView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub is_available: bool,
    pub is_special: bool,
}

impl From<&MenuItem> for MenuItemFormView {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: item.id.as_i32(),
            name: item.name.clone(),
            description: item.description.clone().unwrap_or_default(),
            price: item.price,
            image_url: item.image_url.clone().unwrap_or_default(),
            is_available: item.is_available,
            is_special: item.is_special,
        }
    }
}

/// One category's items on the back-office menu screen.
pub struct MenuAdminSection {
    pub name: String,
    pub items: Vec<MenuItemFormView>,
}

/// Back-office menu screen template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/menu.html")]
pub struct MenuAdminTemplate {
    pub admin_name: String,
    pub sections: Vec<MenuAdminSection>,
}

/// Render the menu management screen, every item included.
#[instrument(skip(state, admin))]
pub async fn menu_page(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let repo = MenuRepository::new(state.pool());
    let categories = repo.list_categories().await?;
    let items = repo.list_all_items().await?;

    let sections = categories
        .iter()
        .map(|category| MenuAdminSection {
            name: category.name.clone(),
            items: items
                .iter()
                .filter(|item| item.category_id == category.id)
                .map(MenuItemFormView::from)
                .collect(),
        })
        .filter(|section| !section.items.is_empty())
        .collect();

    Ok(MenuAdminTemplate {
        admin_name: admin.name,
        sections,
    })
}

/// Menu item edit form data.
#[derive(Debug, Deserialize)]
pub struct MenuItemForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub is_special: bool,
}

impl TryFrom<MenuItemForm> for MenuItemUpdate {
    type Error = AppError;

    fn try_from(form: MenuItemForm) -> Result<Self> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_owned()));
        }

        let price: Decimal = form
            .price
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid price: {}", form.price)))?;
        if price < Decimal::ZERO {
            return Err(AppError::BadRequest("price cannot be negative".to_owned()));
        }

        Ok(Self {
            name: name.to_owned(),
            description: blank_to_none(&form.description),
            price,
            image_url: blank_to_none(&form.image_url),
            is_special: form.is_special,
        })
    }
}

fn blank_to_none(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Rewrite a menu item's editable fields from the back office.
#[instrument(skip(state, _admin, form))]
pub async fn update_menu_item(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<MenuItemForm>,
) -> Result<Response> {
    let update = MenuItemUpdate::try_from(form)?;
    MenuRepository::new(state.pool())
        .update_item(MenuItemId::new(id), &update)
        .await?;
    Ok(Redirect::to("/admin/menu").into_response())
}

/// Menu availability form data.
#[derive(Debug, Deserialize)]
pub struct AvailabilityForm {
    #[serde(default)]
    pub available: bool,
}

/// Flip a menu item's availability from the back office.
#[instrument(skip(state, _admin))]
pub async fn set_menu_availability(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<AvailabilityForm>,
) -> Result<Response> {
    MenuRepository::new(state.pool())
        .set_availability(MenuItemId::new(id), form.available)
        .await?;
    Ok(Redirect::to("/admin/menu").into_response())
}

// =============================================================================
// Hours
// =============================================================================

/// One weekday row on the hours screen.
pub struct HourFormView {
    pub day_of_week: i32,
    pub day_label: &'static str,
    pub is_open: bool,
    pub open_time: String,
    pub close_time: String,
    pub open_time_2: String,
    pub close_time_2: String,
}

impl From<&BusinessHour> for HourFormView {
    fn from(hour: &BusinessHour) -> Self {
        Self {
            day_of_week: hour.day_of_week,
            day_label: hour.day_label(),
            is_open: hour.is_open,
            open_time: time_value(hour.open_time),
            close_time: time_value(hour.close_time),
            open_time_2: time_value(hour.open_time_2),
            close_time_2: time_value(hour.close_time_2),
        }
    }
}

fn time_value(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default()
}

/// Hours screen template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/hours.html")]
pub struct HoursTemplate {
    pub admin_name: String,
    pub rows: Vec<HourFormView>,
}

/// Render the opening-hours screen.
#[instrument(skip(state, admin))]
pub async fn hours_page(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let hours = SettingsRepository::new(state.pool()).hours().await?;
    Ok(HoursTemplate {
        admin_name: admin.name,
        rows: hours.iter().map(HourFormView::from).collect(),
    })
}

/// Weekday hours form data. Time fields hold `HH:MM` or blank.
#[derive(Debug, Deserialize)]
pub struct HoursForm {
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub open_time: String,
    #[serde(default)]
    pub close_time: String,
    #[serde(default)]
    pub open_time_2: String,
    #[serde(default)]
    pub close_time_2: String,
}

impl TryFrom<HoursForm> for HoursUpdate {
    type Error = AppError;

    fn try_from(form: HoursForm) -> Result<Self> {
        Ok(Self {
            is_open: form.is_open,
            open_time: parse_time(&form.open_time)?,
            close_time: parse_time(&form.close_time)?,
            open_time_2: parse_time(&form.open_time_2)?,
            close_time_2: parse_time(&form.close_time_2)?,
        })
    }
}

fn parse_time(value: &str) -> Result<Option<NaiveTime>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("invalid time: {value}")))
}

/// Replace one weekday's hours from the back office.
#[instrument(skip(state, _admin))]
pub async fn update_hours(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(day): Path<i32>,
    Form(form): Form<HoursForm>,
) -> Result<Response> {
    if !(0..=6).contains(&day) {
        return Err(AppError::BadRequest(format!("invalid weekday: {day}")));
    }

    let update = HoursUpdate::try_from(form)?;
    SettingsRepository::new(state.pool())
        .set_hours(day, &update)
        .await?;
    Ok(Redirect::to("/admin/hours").into_response())
}

// =============================================================================
// Settings
// =============================================================================

/// Settings screen template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/settings.html")]
pub struct SettingsTemplate {
    pub admin_name: String,
    pub settings: SiteSettings,
}

/// Render the settings screen.
#[instrument(skip(state, admin))]
pub async fn settings_page(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let settings = SettingsRepository::new(state.pool()).settings().await?;
    Ok(SettingsTemplate {
        admin_name: admin.name,
        settings,
    })
}

/// Settings form data. Checkboxes post `true` when checked and are absent
/// otherwise.
#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub orders_open: bool,
    #[serde(default)]
    pub dine_in_enabled: bool,
    #[serde(default)]
    pub pickup_enabled: bool,
    #[serde(default)]
    pub delivery_enabled: bool,
    pub delivery_fee: String,
    #[serde(default)]
    pub restaurant_phone: String,
    #[serde(default)]
    pub restaurant_address: String,
}

impl TryFrom<SettingsForm> for SiteSettings {
    type Error = AppError;

    fn try_from(form: SettingsForm) -> Result<Self> {
        let delivery_fee: Decimal = form.delivery_fee.trim().parse().map_err(|_| {
            AppError::BadRequest(format!("invalid delivery fee: {}", form.delivery_fee))
        })?;
        if delivery_fee < Decimal::ZERO {
            return Err(AppError::BadRequest(
                "delivery fee cannot be negative".to_owned(),
            ));
        }

        Ok(Self {
            orders_open: form.orders_open,
            dine_in_enabled: form.dine_in_enabled,
            pickup_enabled: form.pickup_enabled,
            delivery_enabled: form.delivery_enabled,
            delivery_fee,
            restaurant_phone: form.restaurant_phone.trim().to_owned(),
            restaurant_address: form.restaurant_address.trim().to_owned(),
        })
    }
}

/// Save the settings from the back office.
#[instrument(skip(state, _admin, form))]
pub async fn update_settings(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Form(form): Form<SettingsForm>,
) -> Result<Response> {
    let settings = SiteSettings::try_from(form)?;
    SettingsRepository::new(state.pool()).save(&settings).await?;
    Ok(Redirect::to("/admin/settings").into_response())
}

// =============================================================================
// Realtime
// =============================================================================

/// Server-sent events stream of order changes.
///
/// Emits one `order-changed` event per database notification; the board
/// refetches on each event. Lagged subscribers drop events silently, which
/// is fine because every event means "refetch", not "apply this delta".
#[instrument(skip(state, _admin))]
pub async fn events(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.order_events().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => Some(Ok(Event::default().event("order-changed").data(event.payload))),
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_field() {
        assert_eq!(parse_time("").unwrap(), None);
        assert_eq!(parse_time("  ").unwrap(), None);
        assert_eq!(
            parse_time("12:30").unwrap(),
            Some(NaiveTime::from_hms_opt(12, 30, 0).unwrap())
        );
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("noon").is_err());
    }

    #[test]
    fn test_hours_form_conversion() {
        let update = HoursUpdate::try_from(HoursForm {
            is_open: true,
            open_time: "12:00".to_owned(),
            close_time: "15:00".to_owned(),
            open_time_2: String::new(),
            close_time_2: String::new(),
        })
        .unwrap();

        assert!(update.is_open);
        assert_eq!(update.open_time, NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(update.open_time_2, None);
    }

    fn item_form(name: &str, price: &str) -> MenuItemForm {
        MenuItemForm {
            name: name.to_owned(),
            description: String::new(),
            price: price.to_owned(),
            image_url: "  ".to_owned(),
            is_special: true,
        }
    }

    #[test]
    fn test_menu_item_form_conversion() {
        let update = MenuItemUpdate::try_from(item_form("  Locro  ", "10500")).unwrap();
        assert_eq!(update.name, "Locro");
        assert_eq!(update.price, Decimal::from(10_500));
        assert_eq!(update.description, None);
        assert_eq!(update.image_url, None);
        assert!(update.is_special);
    }

    #[test]
    fn test_menu_item_form_rejects_bad_input() {
        assert!(MenuItemUpdate::try_from(item_form("   ", "100")).is_err());
        assert!(MenuItemUpdate::try_from(item_form("Locro", "gratis")).is_err());
        assert!(MenuItemUpdate::try_from(item_form("Locro", "-5")).is_err());
    }

    fn settings_form(fee: &str) -> SettingsForm {
        SettingsForm {
            orders_open: true,
            dine_in_enabled: false,
            pickup_enabled: true,
            delivery_enabled: false,
            delivery_fee: fee.to_owned(),
            restaurant_phone: " +54 11 5555 ".to_owned(),
            restaurant_address: "Calle 1".to_owned(),
        }
    }

    #[test]
    fn test_settings_form_conversion() {
        let settings = SiteSettings::try_from(settings_form("750")).unwrap();
        assert!(settings.orders_open);
        assert!(!settings.dine_in_enabled);
        assert!(!settings.delivery_enabled);
        assert_eq!(settings.delivery_fee, Decimal::from(750));
        assert_eq!(settings.restaurant_phone, "+54 11 5555");
    }

    #[test]
    fn test_settings_form_rejects_bad_fee() {
        assert!(SiteSettings::try_from(settings_form("mucho")).is_err());
        assert!(SiteSettings::try_from(settings_form("-1")).is_err());
    }
}
