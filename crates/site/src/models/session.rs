//! Session-related types.
//!
//! Types stored in the session: the visitor's cart and checkout progress,
//! and the back-office login identity.

use serde::{Deserialize, Serialize};

use charret_core::AdminUserId;

/// Session-stored admin identity.
///
/// Minimal data stored in the session to identify the logged-in admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's database ID.
    pub id: AdminUserId,
    /// Admin's email address.
    pub email: String,
    /// Display name for the back-office header.
    pub name: String,
}

/// Session keys.
pub mod keys {
    /// Key for the visitor's cart. Fixed application key: the cart is
    /// re-serialized under it after every mutation.
    pub const CART: &str = "cart";

    /// Key for the checkout wizard state.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
