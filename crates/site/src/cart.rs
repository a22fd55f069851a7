//! The cart store: single source of truth for the order in progress.
//!
//! One `Cart` lives in each visitor's session and is re-serialized after
//! every mutation. Totals are derived from the line items on every read and
//! never stored, so they cannot drift from the items themselves.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use charret_core::MenuItemId;

use crate::models::session_keys;

/// One distinct orderable product line in the active order.
///
/// Exactly one entry exists per menu item id; repeated adds aggregate into
/// `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: MenuItemId,
    pub name: String,
    /// Unit price in pesos, snapshotted when the item was first added.
    pub price: Decimal,
    pub image_url: Option<String>,
    /// Always >= 1; a drop to 0 removes the line instead.
    pub quantity: u32,
}

impl CartItem {
    /// Price times quantity for this line.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The ordered set of not-yet-submitted line items plus panel visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Insertion order = first-added order.
    pub items: Vec<CartItem>,
    /// Whether the slide-in cart panel is open. Pure UI state.
    pub is_open: bool,
}

impl Cart {
    /// Add one unit of a menu item.
    ///
    /// If a line with the same id exists, its quantity is incremented;
    /// otherwise a new line is appended with quantity 1.
    pub fn add_item(&mut self, id: MenuItemId, name: &str, price: Decimal, image_url: Option<&str>) {
        if let Some(existing) = self.items.iter_mut().find(|item| item.id == id) {
            existing.quantity += 1;
            return;
        }
        self.items.push(CartItem {
            id,
            name: name.to_owned(),
            price,
            image_url: image_url.map(str::to_owned),
            quantity: 1,
        });
    }

    /// Set a line's quantity. A target of 0 or less removes the line.
    /// No-op when the id is not in the cart.
    pub fn update_quantity(&mut self, id: MenuItemId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
        }
    }

    /// Remove a line if present; no-op otherwise.
    pub fn remove_item(&mut self, id: MenuItemId) {
        self.items.retain(|item| item.id != id);
    }

    /// Empty the cart. Used after a successful order submission.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Toggle panel visibility.
    pub const fn set_open(&mut self, open: bool) {
        self.is_open = open;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of per-line quantities. Recomputed on every call.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of price x quantity over all lines. Recomputed on every call.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartItem::subtotal).sum()
    }
}

// =============================================================================
// Session Persistence
// =============================================================================

/// Load the cart from the session.
///
/// A missing or unparseable value rehydrates as the empty cart, never an
/// error: a stale cart is not worth failing a page view over.
pub async fn load(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Persist the cart to the session. Call after every mutation.
///
/// # Errors
///
/// Returns the session store error if the write fails.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item_id(n: i32) -> MenuItemId {
        MenuItemId::new(n)
    }

    fn cart_with(entries: &[(i32, i64, u32)]) -> Cart {
        // (id, price, quantity)
        let mut cart = Cart::default();
        for &(id, price, quantity) in entries {
            cart.add_item(item_id(id), &format!("item-{id}"), Decimal::from(price), None);
            cart.update_quantity(item_id(id), i64::from(quantity));
        }
        cart
    }

    #[test]
    fn test_add_new_item_appends_with_quantity_one() {
        let mut cart = Cart::default();
        cart.add_item(item_id(1), "Milanesa", Decimal::from(21_000), None);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_add_same_id_twice_aggregates() {
        let mut cart = Cart::default();
        cart.add_item(item_id(1), "Locro", Decimal::from(10_500), None);
        cart.add_item(item_id(1), "Locro", Decimal::from(10_500), None);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.total_price(), Decimal::from(21_000));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut cart = Cart::default();
        cart.add_item(item_id(3), "C", Decimal::from(1), None);
        cart.add_item(item_id(1), "A", Decimal::from(1), None);
        cart.add_item(item_id(3), "C", Decimal::from(1), None);
        cart.add_item(item_id(2), "B", Decimal::from(1), None);

        let ids: Vec<i32> = cart.items.iter().map(|i| i.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_update_quantity_sets_value() {
        let mut cart = cart_with(&[(1, 500, 1)]);
        cart.update_quantity(item_id(1), 4);
        assert_eq!(cart.total_items(), 4);
        assert_eq!(cart.total_price(), Decimal::from(2_000));
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = cart_with(&[(1, 500, 2)]);
        cart.update_quantity(item_id(1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_negative_removes() {
        let mut cart = cart_with(&[(1, 500, 2)]);
        cart.update_quantity(item_id(1), -1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_unknown_id_is_noop() {
        let mut cart = cart_with(&[(1, 500, 2)]);
        let before = cart.clone();
        cart.update_quantity(item_id(99), 5);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_item_unknown_id_is_noop() {
        let mut cart = cart_with(&[(1, 500, 2)]);
        let before = cart.clone();
        cart.remove_item(item_id(99));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut cart = cart_with(&[(1, 500, 2), (2, 300, 1)]);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_set_open_is_pure_ui_state() {
        let mut cart = cart_with(&[(1, 500, 2)]);
        cart.set_open(true);
        assert!(cart.is_open);
        assert_eq!(cart.total_items(), 2);
        cart.set_open(false);
        assert!(!cart.is_open);
    }

    #[test]
    fn test_totals_never_drift_from_recomputation() {
        // Exercise a mixed mutation sequence and check the invariant after
        // every step: totals equal a direct recomputation over the lines.
        let mut cart = Cart::default();
        let check = |cart: &Cart| {
            let items: u32 = cart.items.iter().map(|i| i.quantity).sum();
            let price: Decimal = cart
                .items
                .iter()
                .map(|i| i.price * Decimal::from(i.quantity))
                .sum();
            assert_eq!(cart.total_items(), items);
            assert_eq!(cart.total_price(), price);
        };

        cart.add_item(item_id(1), "A", Decimal::from(1_000), None);
        check(&cart);
        cart.add_item(item_id(2), "B", Decimal::from(750), Some("b.jpg"));
        check(&cart);
        cart.add_item(item_id(1), "A", Decimal::from(1_000), None);
        check(&cart);
        cart.update_quantity(item_id(2), 7);
        check(&cart);
        cart.update_quantity(item_id(1), 0);
        check(&cart);
        cart.remove_item(item_id(2));
        check(&cart);
    }

    #[test]
    fn test_serde_roundtrip_preserves_cart() {
        let mut cart = cart_with(&[(1, 10_500, 2), (2, 3_500, 6)]);
        cart.set_open(true);
        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
