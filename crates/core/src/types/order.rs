//! Order enums: fulfillment modality, payment method, and order status.
//!
//! These are stored as text in the database and parsed back via `FromStr`,
//! so `Display`/`FromStr` must stay in sync with the column CHECK constraints.

use serde::{Deserialize, Serialize};

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// Eat at the restaurant.
    DineIn,
    /// Pick up at the counter.
    Pickup,
    /// Delivered to the customer's address (carries a fixed surcharge).
    Delivery,
}

impl Modality {
    /// All modalities, in display order.
    pub const ALL: [Self; 3] = [Self::DineIn, Self::Pickup, Self::Delivery];

    /// Whether a delivery address is required at submission time.
    #[must_use]
    pub const fn requires_address(self) -> bool {
        matches!(self, Self::Delivery)
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DineIn => write!(f, "dine_in"),
            Self::Pickup => write!(f, "pickup"),
            Self::Delivery => write!(f, "delivery"),
        }
    }
}

impl std::str::FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dine_in" => Ok(Self::DineIn),
            "pickup" => Ok(Self::Pickup),
            "delivery" => Ok(Self::Delivery),
            _ => Err(format!("invalid modality: {s}")),
        }
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Mercado Pago (card, QR, or transfer).
    MercadoPago,
    /// Cash on receipt.
    Cash,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MercadoPago => write!(f, "mercado_pago"),
            Self::Cash => write!(f, "cash"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mercado_pago" => Ok(Self::MercadoPago),
            "cash" => Ok(Self::Cash),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Kitchen-side order status.
///
/// Orders move along the fixed sequence pending → preparing → ready →
/// delivered; `cancelled` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The forward flow, excluding `Cancelled`.
    pub const FLOW: [Self; 4] = [Self::Pending, Self::Preparing, Self::Ready, Self::Delivered];

    /// The next status in the forward flow, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether a transition to `target` is allowed.
    ///
    /// Forward steps move one at a time; cancellation is allowed from any
    /// non-terminal state.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        if target == Self::Cancelled {
            return !self.is_terminal();
        }
        self.next() == Some(target)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Preparing => write!(f, "preparing"),
            Self::Ready => write!(f, "ready"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_forward_flow() {
        assert_eq!(OrderStatus::Pending.next(), Some(OrderStatus::Preparing));
        assert_eq!(OrderStatus::Preparing.next(), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::Ready.next(), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::Delivered.next(), None);
        assert_eq!(OrderStatus::Cancelled.next(), None);
    }

    #[test]
    fn test_status_cancel_from_non_terminal() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_status_no_skipping() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_modality_string_roundtrip() {
        for modality in Modality::ALL {
            let parsed: Modality = modality.to_string().parse().unwrap();
            assert_eq!(parsed, modality);
        }
        assert!("drive_thru".parse::<Modality>().is_err());
    }

    #[test]
    fn test_modality_requires_address() {
        assert!(Modality::Delivery.requires_address());
        assert!(!Modality::Pickup.requires_address());
        assert!(!Modality::DineIn.requires_address());
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::MercadoPago).unwrap();
        assert_eq!(json, "\"mercado_pago\"");
    }
}
