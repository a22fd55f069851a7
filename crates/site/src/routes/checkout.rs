//! Checkout wizard route handlers.
//!
//! Every POST follows post-redirect-get back to `GET /checkout`, which
//! renders whatever step the session's checkout state is on. Confirm is the
//! one terminal action: it snapshots the cart into an order draft, runs the
//! submission, and on success discards both cart and checkout state.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use charret_core::{Modality, PaymentMethod};

use crate::cart::{self, Cart};
use crate::checkout::{self, BackOutcome, CheckoutState, CheckoutStep};
use crate::db::OrderRepository;
use crate::error::Result;
use crate::filters;
use crate::routes::cart::CartItemView;
use crate::state::AppState;

/// One entry in the progress bar.
pub struct StepView {
    pub number: u8,
    pub label: &'static str,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub steps: Vec<StepView>,
    pub current_step: u8,
    pub can_proceed: bool,
    pub is_last_step: bool,
    pub submit_error: bool,
    pub dine_in_selected: bool,
    pub pickup_selected: bool,
    pub delivery_selected: bool,
    pub mercado_pago_selected: bool,
    pub cash_selected: bool,
    pub is_delivery: bool,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub customer_address: String,
    pub customer_notes: String,
    pub items: Vec<CartItemView>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub final_total: Decimal,
    pub configured_delivery_fee: Decimal,
}

/// Empty-cart checkout template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout_empty.html")]
pub struct CheckoutEmptyTemplate;

fn all_steps() -> Vec<StepView> {
    [
        CheckoutStep::CartReview,
        CheckoutStep::Modality,
        CheckoutStep::CustomerData,
        CheckoutStep::Payment,
    ]
    .into_iter()
    .map(|step| StepView {
        number: step.number(),
        label: step.label(),
    })
    .collect()
}

fn page(state: &AppState, cart: &Cart, checkout: &CheckoutState, submit_error: bool) -> CheckoutTemplate {
    let fee = state.config().delivery_fee;
    CheckoutTemplate {
        steps: all_steps(),
        current_step: checkout.step.number(),
        can_proceed: checkout.can_proceed(cart),
        is_last_step: checkout.step == CheckoutStep::Payment,
        submit_error,
        dine_in_selected: checkout.modality == Some(Modality::DineIn),
        pickup_selected: checkout.modality == Some(Modality::Pickup),
        delivery_selected: checkout.modality == Some(Modality::Delivery),
        mercado_pago_selected: checkout.payment_method == Some(PaymentMethod::MercadoPago),
        cash_selected: checkout.payment_method == Some(PaymentMethod::Cash),
        is_delivery: checkout.modality == Some(Modality::Delivery),
        customer_name: checkout.customer.name.clone(),
        customer_phone: checkout.customer.phone.clone(),
        customer_email: checkout.customer.email.clone(),
        customer_address: checkout.customer.address.clone(),
        customer_notes: checkout.customer.notes.clone(),
        items: crate::routes::cart::CartView::from(cart).items,
        subtotal: cart.total_price(),
        delivery_fee: checkout.delivery_fee(fee),
        final_total: checkout.final_total(cart, fee),
        configured_delivery_fee: fee,
    }
}

/// Checkout page query parameters.
#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    /// Set after a failed submission to show a retry banner.
    pub error: Option<u8>,
}

/// Render the checkout wizard at its current step.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CheckoutQuery>,
) -> Result<Response> {
    let cart = cart::load(&session).await;
    if cart.is_empty() {
        return Ok(CheckoutEmptyTemplate.into_response());
    }

    let checkout = checkout::load(&session).await;
    let submit_error = query.error.is_some();
    Ok(page(&state, &cart, &checkout, submit_error).into_response())
}

/// Modality selection form data.
#[derive(Debug, Deserialize)]
pub struct ModalityForm {
    pub modality: String,
}

/// Record the chosen fulfillment modality.
#[instrument(skip(session))]
pub async fn set_modality(session: Session, Form(form): Form<ModalityForm>) -> Result<Response> {
    let modality: Modality = form
        .modality
        .parse()
        .map_err(crate::error::AppError::BadRequest)?;

    let mut checkout = checkout::load(&session).await;
    checkout.modality = Some(modality);
    checkout::save(&session, &checkout).await?;

    Ok(Redirect::to("/checkout").into_response())
}

/// Customer data form fields.
#[derive(Debug, Deserialize)]
pub struct CustomerDataForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

/// Record the customer contact fields.
#[instrument(skip(session, form))]
pub async fn set_customer(session: Session, Form(form): Form<CustomerDataForm>) -> Result<Response> {
    let mut checkout = checkout::load(&session).await;
    checkout.customer.name = form.name;
    checkout.customer.phone = form.phone;
    checkout.customer.email = form.email;
    checkout.customer.address = form.address;
    checkout.customer.notes = form.notes;
    checkout::save(&session, &checkout).await?;

    Ok(Redirect::to("/checkout").into_response())
}

/// Payment method selection form data.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub payment_method: String,
}

/// Record the chosen payment method.
#[instrument(skip(session))]
pub async fn set_payment(session: Session, Form(form): Form<PaymentForm>) -> Result<Response> {
    let payment_method: PaymentMethod = form
        .payment_method
        .parse()
        .map_err(crate::error::AppError::BadRequest)?;

    let mut checkout = checkout::load(&session).await;
    checkout.payment_method = Some(payment_method);
    checkout::save(&session, &checkout).await?;

    Ok(Redirect::to("/checkout").into_response())
}

/// Move to the next step if the current step's guard allows it.
///
/// A blocked advance is not an error; the page re-renders on the same step
/// with the guard unsatisfied.
#[instrument(skip(session))]
pub async fn next(session: Session) -> Result<Response> {
    let cart = cart::load(&session).await;
    let mut checkout = checkout::load(&session).await;
    if checkout.advance(&cart) {
        checkout::save(&session, &checkout).await?;
    }
    Ok(Redirect::to("/checkout").into_response())
}

/// Move to the previous step; from the first step this leaves the flow.
///
/// Leaving discards the checkout state but never the cart.
#[instrument(skip(session))]
pub async fn back(session: Session) -> Result<Response> {
    let mut checkout = checkout::load(&session).await;
    match checkout.back() {
        BackOutcome::Exit => {
            checkout::clear(&session).await?;
            Ok(Redirect::to("/").into_response())
        }
        BackOutcome::MovedTo(_) => {
            checkout::save(&session, &checkout).await?;
            Ok(Redirect::to("/checkout").into_response())
        }
    }
}

/// Submit the order.
///
/// Marks the checkout as submitting before any database work so a double
/// post of the confirm form is rejected by `can_submit`; two posts racing
/// past that flag are collapsed by the order's submission key. On success
/// the cart and checkout state are discarded and the customer lands on the
/// confirmation page. On failure the submitting flag is reset and the
/// wizard re-renders with everything intact, ready for a retry.
#[instrument(skip(state, session))]
pub async fn confirm(State(state): State<AppState>, session: Session) -> Result<Response> {
    let cart = cart::load(&session).await;
    let mut checkout = checkout::load(&session).await;

    if !checkout.can_submit(&cart) {
        return Ok(Redirect::to("/checkout").into_response());
    }

    let fee = state.config().delivery_fee;
    let Some(draft) = checkout.draft(&cart, fee) else {
        return Ok(Redirect::to("/checkout").into_response());
    };

    checkout.begin_submission();
    checkout::save(&session, &checkout).await?;

    let submitted = OrderRepository::new(state.pool()).submit(&draft).await;

    match submitted {
        Ok(confirmation) => {
            cart::save(&session, &Cart::default()).await?;
            checkout::clear(&session).await?;
            tracing::info!(
                order_id = %confirmation.id,
                order_number = confirmation.order_number,
                "Order submitted"
            );
            Ok(Redirect::to(&format!(
                "/order-success?order={}",
                confirmation.order_number
            ))
            .into_response())
        }
        Err(e) => {
            tracing::error!("Order submission failed: {e}");
            checkout.submission_failed();
            checkout::save(&session, &checkout).await?;
            Ok(Redirect::to("/checkout?error=1").into_response())
        }
    }
}
