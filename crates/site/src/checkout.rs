//! The checkout wizard: a four-step state machine over the cart.
//!
//! Steps collect fulfillment modality, customer data, and payment method.
//! Forward navigation is gated on a per-step guard; going back from the
//! first step exits the flow. Submission is a terminal action distinct from
//! the numbered steps: it turns the checkout state plus the live cart into
//! an [`OrderDraft`] for the order repository.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use charret_core::{MenuItemId, Modality, PaymentMethod};

use crate::cart::Cart;
use crate::models::session_keys;

/// The numbered wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    CartReview,
    Modality,
    CustomerData,
    Payment,
}

impl CheckoutStep {
    /// 1-based step number for display.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::CartReview => 1,
            Self::Modality => 2,
            Self::CustomerData => 3,
            Self::Payment => 4,
        }
    }

    /// Display label for the progress bar.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CartReview => "Carrito",
            Self::Modality => "Modalidad",
            Self::CustomerData => "Datos",
            Self::Payment => "Pago",
        }
    }

    const fn next(self) -> Option<Self> {
        match self {
            Self::CartReview => Some(Self::Modality),
            Self::Modality => Some(Self::CustomerData),
            Self::CustomerData => Some(Self::Payment),
            Self::Payment => None,
        }
    }

    const fn previous(self) -> Option<Self> {
        match self {
            Self::CartReview => None,
            Self::Modality => Some(Self::CartReview),
            Self::CustomerData => Some(Self::Modality),
            Self::Payment => Some(Self::CustomerData),
        }
    }
}

/// Free-form customer fields collected at step 3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub notes: String,
}

/// Result of a backward navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// Left the flow entirely (was on step 1); caller routes to the menu.
    Exit,
    /// Moved to the previous step.
    MovedTo(CheckoutStep),
}

/// Progress through the order-placement wizard.
///
/// Created fresh on entering checkout, discarded on successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutState {
    pub step: CheckoutStep,
    pub modality: Option<Modality>,
    pub payment_method: Option<PaymentMethod>,
    pub customer: CustomerForm,
    /// Set while a submission is in flight; blocks re-entry of confirm.
    pub is_submitting: bool,
    /// Random key minted with the state and stored on the order row under a
    /// unique index. Two confirms racing past `is_submitting` carry the same
    /// key, so the database admits at most one order per checkout.
    #[serde(default = "new_submission_key")]
    pub submission_key: String,
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self {
            step: CheckoutStep::default(),
            modality: None,
            payment_method: None,
            customer: CustomerForm::default(),
            is_submitting: false,
            submission_key: new_submission_key(),
        }
    }
}

fn new_submission_key() -> String {
    Uuid::new_v4().to_string()
}

impl CheckoutState {
    /// The current step's completion predicate.
    ///
    /// | Step | Can proceed when |
    /// |------|------------------|
    /// | 1    | cart is non-empty |
    /// | 2    | a modality is selected |
    /// | 3    | name and phone set, address too if delivery |
    /// | 4    | a payment method is selected |
    #[must_use]
    pub fn can_proceed(&self, cart: &Cart) -> bool {
        match self.step {
            CheckoutStep::CartReview => !cart.is_empty(),
            CheckoutStep::Modality => self.modality.is_some(),
            CheckoutStep::CustomerData => {
                let address_ok = self
                    .modality
                    .is_none_or(|m| !m.requires_address() || !self.customer.address.trim().is_empty());
                !self.customer.name.trim().is_empty()
                    && !self.customer.phone.trim().is_empty()
                    && address_ok
            }
            CheckoutStep::Payment => self.payment_method.is_some(),
        }
    }

    /// Forward transition. Only moves when the current step's predicate
    /// holds; capped at the payment step. Returns whether a move happened.
    pub fn advance(&mut self, cart: &Cart) -> bool {
        if !self.can_proceed(cart) {
            return false;
        }
        match self.step.next() {
            Some(next) => {
                self.step = next;
                true
            }
            None => false,
        }
    }

    /// Backward transition. Unguarded; exits the flow from step 1.
    pub fn back(&mut self) -> BackOutcome {
        match self.step.previous() {
            Some(previous) => {
                self.step = previous;
                BackOutcome::MovedTo(previous)
            }
            None => BackOutcome::Exit,
        }
    }

    /// The delivery surcharge for the selected modality. Recomputed on
    /// every read from `modality` and the configured fee, never cached.
    #[must_use]
    pub fn delivery_fee(&self, configured_fee: Decimal) -> Decimal {
        if self.modality == Some(Modality::Delivery) {
            configured_fee
        } else {
            Decimal::ZERO
        }
    }

    /// Cart total plus the delivery surcharge.
    #[must_use]
    pub fn final_total(&self, cart: &Cart, configured_fee: Decimal) -> Decimal {
        cart.total_price() + self.delivery_fee(configured_fee)
    }

    /// Whether confirm is allowed right now: on the payment step, with its
    /// predicate satisfied, and no submission already in flight.
    #[must_use]
    pub fn can_submit(&self, cart: &Cart) -> bool {
        self.step == CheckoutStep::Payment
            && !cart.is_empty()
            && self.can_proceed(cart)
            && !self.is_submitting
    }

    /// Mark a submission as in flight. Must be persisted before any
    /// database work so a double post of the confirm form is refused by
    /// [`Self::can_submit`].
    pub const fn begin_submission(&mut self) {
        self.is_submitting = true;
    }

    /// Record a failed submission. Clears only the in-flight flag; the
    /// steps, the collected fields, and the submission key are kept so the
    /// customer can retry as-is.
    pub const fn submission_failed(&mut self) {
        self.is_submitting = false;
    }

    /// Build the order draft snapshotted from this state and the live cart.
    ///
    /// Returns `None` unless every required field is present: a non-empty
    /// cart, modality, payment method, name, phone, and an address when the
    /// modality is delivery.
    #[must_use]
    pub fn draft(&self, cart: &Cart, configured_fee: Decimal) -> Option<OrderDraft> {
        let modality = self.modality?;
        let payment_method = self.payment_method?;
        let name = non_empty(&self.customer.name)?;
        let phone = non_empty(&self.customer.phone)?;

        let address = if modality.requires_address() {
            Some(non_empty(&self.customer.address)?)
        } else {
            None
        };

        if cart.is_empty() {
            return None;
        }

        let subtotal = cart.total_price();
        let delivery_fee = self.delivery_fee(configured_fee);

        let items = cart
            .items
            .iter()
            .map(|item| OrderItemDraft {
                menu_item_id: item.id,
                name: item.name.clone(),
                price: item.price,
                quantity: item.quantity,
                subtotal: item.subtotal(),
            })
            .collect();

        Some(OrderDraft {
            submission_key: self.submission_key.clone(),
            customer: CustomerDraft {
                name,
                phone,
                email: non_empty(&self.customer.email),
                address: address.clone(),
                notes: non_empty(&self.customer.notes),
            },
            modality,
            payment_method,
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
            delivery_address: address,
            notes: non_empty(&self.customer.notes),
            items,
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Customer fields written by the first submission step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDraft {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    /// Only set when the order is a delivery.
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// One order line, snapshotted from the cart at submission time so later
/// menu edits never alter historical orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemDraft {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub subtotal: Decimal,
}

/// Everything the order repository needs for the three-step submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    /// Stored on the order row; a duplicate submission of the same checkout
    /// is detected by the unique index on this value.
    pub submission_key: String,
    pub customer: CustomerDraft,
    pub modality: Modality,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemDraft>,
}

// =============================================================================
// Session Persistence
// =============================================================================

/// Load the checkout state from the session, defaulting to a fresh one.
pub async fn load(session: &Session) -> CheckoutState {
    session
        .get::<CheckoutState>(session_keys::CHECKOUT)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Persist the checkout state to the session.
///
/// # Errors
///
/// Returns the session store error if the write fails.
pub async fn save(
    session: &Session,
    state: &CheckoutState,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CHECKOUT, state).await
}

/// Discard the checkout state (successful submission or exit from step 1).
///
/// # Errors
///
/// Returns the session store error if the removal fails.
pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CheckoutState>(session_keys::CHECKOUT)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FEE: Decimal = Decimal::ZERO; // overridden per test where relevant

    fn fee() -> Decimal {
        Decimal::from(500)
    }

    fn cart_with_one(id: i32, price: i64, quantity: i64) -> Cart {
        let mut cart = Cart::default();
        cart.add_item(MenuItemId::new(id), "A", Decimal::from(price), None);
        cart.update_quantity(MenuItemId::new(id), quantity);
        cart
    }

    fn filled_customer() -> CustomerForm {
        CustomerForm {
            name: "Ana".to_owned(),
            phone: "+54 11 5555".to_owned(),
            email: String::new(),
            address: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_step_one_requires_non_empty_cart() {
        let state = CheckoutState::default();
        assert!(!state.can_proceed(&Cart::default()));
        assert!(state.can_proceed(&cart_with_one(1, 1_000, 1)));
    }

    #[test]
    fn test_step_two_requires_modality() {
        let cart = cart_with_one(1, 1_000, 1);
        let mut state = CheckoutState {
            step: CheckoutStep::Modality,
            ..CheckoutState::default()
        };
        assert!(!state.can_proceed(&cart));
        state.modality = Some(Modality::Pickup);
        assert!(state.can_proceed(&cart));
    }

    #[test]
    fn test_step_three_requires_name_and_phone() {
        let cart = cart_with_one(1, 1_000, 1);
        let mut state = CheckoutState {
            step: CheckoutStep::CustomerData,
            modality: Some(Modality::Pickup),
            ..CheckoutState::default()
        };
        assert!(!state.can_proceed(&cart));

        state.customer.name = "Ana".to_owned();
        assert!(!state.can_proceed(&cart));

        state.customer.phone = "+54 11 5555".to_owned();
        assert!(state.can_proceed(&cart));
    }

    #[test]
    fn test_step_three_delivery_requires_address() {
        let cart = cart_with_one(1, 1_000, 1);
        let mut state = CheckoutState {
            step: CheckoutStep::CustomerData,
            modality: Some(Modality::Delivery),
            customer: filled_customer(),
            ..CheckoutState::default()
        };
        assert!(!state.can_proceed(&cart));

        state.customer.address = "Calle 1".to_owned();
        assert!(state.can_proceed(&cart));

        // Whitespace-only does not count
        state.customer.address = "   ".to_owned();
        assert!(!state.can_proceed(&cart));
    }

    #[test]
    fn test_step_four_requires_payment_method() {
        let cart = cart_with_one(1, 1_000, 1);
        let mut state = CheckoutState {
            step: CheckoutStep::Payment,
            modality: Some(Modality::Pickup),
            customer: filled_customer(),
            ..CheckoutState::default()
        };
        assert!(!state.can_proceed(&cart));
        state.payment_method = Some(PaymentMethod::Cash);
        assert!(state.can_proceed(&cart));
    }

    #[test]
    fn test_advance_blocked_when_guard_fails() {
        let mut state = CheckoutState::default();
        assert!(!state.advance(&Cart::default()));
        assert_eq!(state.step, CheckoutStep::CartReview);
    }

    #[test]
    fn test_advance_walks_all_steps_and_caps() {
        let cart = cart_with_one(1, 1_000, 1);
        let mut state = CheckoutState {
            modality: Some(Modality::Pickup),
            payment_method: Some(PaymentMethod::Cash),
            customer: filled_customer(),
            ..CheckoutState::default()
        };

        assert!(state.advance(&cart));
        assert_eq!(state.step, CheckoutStep::Modality);
        assert!(state.advance(&cart));
        assert_eq!(state.step, CheckoutStep::CustomerData);
        assert!(state.advance(&cart));
        assert_eq!(state.step, CheckoutStep::Payment);

        // Capped at step 4 even with a satisfied predicate
        assert!(!state.advance(&cart));
        assert_eq!(state.step, CheckoutStep::Payment);
    }

    #[test]
    fn test_back_is_unguarded_and_exits_from_step_one() {
        let mut state = CheckoutState {
            step: CheckoutStep::CustomerData,
            ..CheckoutState::default()
        };
        assert_eq!(state.back(), BackOutcome::MovedTo(CheckoutStep::Modality));
        assert_eq!(state.back(), BackOutcome::MovedTo(CheckoutStep::CartReview));
        assert_eq!(state.back(), BackOutcome::Exit);
        assert_eq!(state.step, CheckoutStep::CartReview);
    }

    #[test]
    fn test_delivery_fee_only_for_delivery() {
        let cart = cart_with_one(1, 1_000, 2);
        let mut state = CheckoutState::default();

        assert_eq!(state.delivery_fee(fee()), Decimal::ZERO);
        assert_eq!(state.final_total(&cart, fee()), Decimal::from(2_000));

        state.modality = Some(Modality::Delivery);
        assert_eq!(state.delivery_fee(fee()), fee());
        assert_eq!(state.final_total(&cart, fee()), Decimal::from(2_500));

        state.modality = Some(Modality::Pickup);
        assert_eq!(state.final_total(&cart, fee()), Decimal::from(2_000));
    }

    #[test]
    fn test_can_submit_blocked_while_submitting() {
        let cart = cart_with_one(1, 1_000, 1);
        let mut state = CheckoutState {
            step: CheckoutStep::Payment,
            modality: Some(Modality::Pickup),
            payment_method: Some(PaymentMethod::Cash),
            customer: filled_customer(),
            ..CheckoutState::default()
        };
        assert!(state.can_submit(&cart));

        state.is_submitting = true;
        assert!(!state.can_submit(&cart));

        state.is_submitting = false;
        assert!(state.can_submit(&cart));
    }

    #[test]
    fn test_failed_submission_preserves_state_and_allows_retry() {
        let cart = cart_with_one(1, 1_000, 3);
        let mut state = CheckoutState {
            step: CheckoutStep::Payment,
            modality: Some(Modality::Pickup),
            payment_method: Some(PaymentMethod::Cash),
            customer: filled_customer(),
            ..CheckoutState::default()
        };
        let first_draft = state.draft(&cart, fee()).unwrap();

        state.begin_submission();
        assert!(!state.can_submit(&cart));

        // The write failed: flag resets, nothing else moves.
        state.submission_failed();
        assert!(state.can_submit(&cart));
        assert_eq!(state.step, CheckoutStep::Payment);
        assert_eq!(state.draft(&cart, fee()).unwrap(), first_draft);
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_submission_key_is_per_checkout_and_stable() {
        let a = CheckoutState::default();
        let b = CheckoutState::default();
        assert!(!a.submission_key.is_empty());
        assert_ne!(a.submission_key, b.submission_key);

        // A retry after failure reuses the same key, so a first attempt
        // that actually committed cannot be duplicated.
        let cart = cart_with_one(1, 1_000, 1);
        let mut state = CheckoutState {
            modality: Some(Modality::Pickup),
            payment_method: Some(PaymentMethod::Cash),
            customer: filled_customer(),
            ..CheckoutState::default()
        };
        let key = state.submission_key.clone();
        state.begin_submission();
        state.submission_failed();
        assert_eq!(state.submission_key, key);
        assert_eq!(state.draft(&cart, fee()).unwrap().submission_key, key);
    }

    #[test]
    fn test_state_from_older_session_gets_a_key() {
        // Sessions serialized before the key existed deserialize with a
        // freshly minted one.
        let json = r#"{
            "step": "payment",
            "modality": "pickup",
            "payment_method": "cash",
            "customer": {"name": "Ana", "phone": "123", "email": "", "address": "", "notes": ""},
            "is_submitting": false
        }"#;
        let state: CheckoutState = serde_json::from_str(json).unwrap();
        assert!(!state.submission_key.is_empty());
    }

    #[test]
    fn test_draft_pickup_scenario() {
        // cart = [{id: A, price: 1000, qty: 2}], pickup
        let cart = cart_with_one(7, 1_000, 2);
        let state = CheckoutState {
            step: CheckoutStep::Payment,
            modality: Some(Modality::Pickup),
            payment_method: Some(PaymentMethod::Cash),
            customer: filled_customer(),
            ..CheckoutState::default()
        };

        let draft = state.draft(&cart, fee()).unwrap();
        assert_eq!(draft.subtotal, Decimal::from(2_000));
        assert_eq!(draft.delivery_fee, Decimal::ZERO);
        assert_eq!(draft.total, Decimal::from(2_000));
        assert_eq!(draft.delivery_address, None);
        assert_eq!(draft.customer.address, None);
        assert_eq!(draft.items.len(), 1);

        let line = &draft.items[0];
        assert_eq!(line.menu_item_id, MenuItemId::new(7));
        assert_eq!(line.price, Decimal::from(1_000));
        assert_eq!(line.quantity, 2);
        assert_eq!(line.subtotal, Decimal::from(2_000));
    }

    #[test]
    fn test_draft_delivery_scenario() {
        // cart = [{id: B, price: 500, qty: 1}], delivery to "Calle 1"
        let cart = cart_with_one(9, 500, 1);
        let mut customer = filled_customer();
        customer.address = "Calle 1".to_owned();
        let state = CheckoutState {
            step: CheckoutStep::Payment,
            modality: Some(Modality::Delivery),
            payment_method: Some(PaymentMethod::MercadoPago),
            customer,
            ..CheckoutState::default()
        };

        let draft = state.draft(&cart, fee()).unwrap();
        assert_eq!(draft.delivery_fee, Decimal::from(500));
        assert_eq!(draft.total, Decimal::from(1_000));
        assert_eq!(draft.delivery_address.as_deref(), Some("Calle 1"));
        assert_eq!(draft.customer.address.as_deref(), Some("Calle 1"));
    }

    #[test]
    fn test_draft_missing_prerequisites_is_none() {
        let cart = cart_with_one(1, 1_000, 1);
        let mut state = CheckoutState {
            modality: Some(Modality::Pickup),
            customer: filled_customer(),
            ..CheckoutState::default()
        };
        // No payment method yet
        assert!(state.draft(&cart, FEE).is_none());

        state.payment_method = Some(PaymentMethod::Cash);
        assert!(state.draft(&cart, FEE).is_some());

        // Empty cart
        assert!(state.draft(&Cart::default(), FEE).is_none());

        // Delivery without address
        state.modality = Some(Modality::Delivery);
        assert!(state.draft(&cart, FEE).is_none());
    }

    #[test]
    fn test_draft_blanks_become_null() {
        let cart = cart_with_one(1, 1_000, 1);
        let state = CheckoutState {
            modality: Some(Modality::Pickup),
            payment_method: Some(PaymentMethod::Cash),
            customer: CustomerForm {
                name: "Ana".to_owned(),
                phone: "123".to_owned(),
                email: "  ".to_owned(),
                address: "ignored for pickup".to_owned(),
                notes: String::new(),
            },
            ..CheckoutState::default()
        };

        let draft = state.draft(&cart, FEE).unwrap();
        assert_eq!(draft.customer.email, None);
        assert_eq!(draft.customer.notes, None);
        assert_eq!(draft.notes, None);
        // Address is absent unless the modality is delivery
        assert_eq!(draft.customer.address, None);
    }
}
