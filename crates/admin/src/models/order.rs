//! Order domain types.
//!
//! An order is the authoritative record of a purchase. Its lifecycle status is
//! derived, never stored; see [`OrderStatus::derive`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::{OrderId, OrderStatus, ProductId, UserId};

/// A customer order for a single product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Customer who placed the order.
    pub user_id: UserId,
    /// Ordered product.
    pub product_id: ProductId,
    /// Ordered units (always positive).
    pub quantity: u32,
    /// When the order was placed at checkout.
    pub created_at: DateTime<Utc>,
    /// When payment was recorded.
    pub paid_at: Option<DateTime<Utc>>,
    /// Amount charged, tax included.
    pub amount_paid: Option<Decimal>,
    /// When the order was delivered.
    pub delivered_at: Option<DateTime<Utc>>,
    /// False once the order has been cancelled.
    pub not_cancelled: bool,
}

impl Order {
    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        OrderStatus::derive(self.delivered_at.is_some(), self.not_cancelled)
    }

    /// The order as delivered and paid at `at`.
    #[must_use]
    pub fn delivered(self, amount: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            delivered_at: Some(at),
            paid_at: Some(at),
            amount_paid: Some(amount),
            ..self
        }
    }

    /// The order as cancelled.
    #[must_use]
    pub fn cancelled(self) -> Self {
        Self {
            not_cancelled: false,
            ..self
        }
    }
}

/// Fields for an order that has not been stored yet (checkout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}
