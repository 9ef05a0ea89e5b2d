//! Order lifecycle rules.
//!
//! ```text
//! Pending -> Delivered
//! Pending -> Cancelled
//! any     -> Deleted   (record removed)
//! ```
//!
//! Nothing leaves `Delivered` or `Cancelled`.

use serde::Serialize;
use thiserror::Error;

use emporium_core::{OrderId, OrderStatus};

use crate::models::Order;

/// A lifecycle transition that can be requested on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Deliver,
    Cancel,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deliver => f.write_str("deliver"),
            Self::Cancel => f.write_str("cancel"),
        }
    }
}

/// The order is not in a state that allows the requested transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {attempted} order {order_id}: order is {from}")]
pub struct InvalidTransition {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub attempted: Transition,
}

#[must_use]
pub const fn can_deliver(order: &Order) -> bool {
    !order.status().is_terminal()
}

#[must_use]
pub const fn can_cancel(order: &Order) -> bool {
    !order.status().is_terminal()
}

/// Check that `transition` is allowed for `order`.
///
/// # Errors
///
/// Returns [`InvalidTransition`] carrying the order's current status.
pub const fn ensure(order: &Order, transition: Transition) -> Result<(), InvalidTransition> {
    let allowed = match transition {
        Transition::Deliver => can_deliver(order),
        Transition::Cancel => can_cancel(order),
    };

    if allowed {
        Ok(())
    } else {
        Err(InvalidTransition {
            order_id: order.id,
            from: order.status(),
            attempted: transition,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use emporium_core::{ProductId, UserId};
    use rust_decimal::Decimal;

    fn pending() -> Order {
        Order {
            id: OrderId::new(11),
            user_id: UserId::new(1),
            product_id: ProductId::new(2),
            quantity: 1,
            created_at: Utc::now(),
            paid_at: None,
            amount_paid: None,
            delivered_at: None,
            not_cancelled: true,
        }
    }

    #[test]
    fn test_pending_allows_both_transitions() {
        let order = pending();
        assert!(can_deliver(&order));
        assert!(can_cancel(&order));
        assert!(ensure(&order, Transition::Deliver).is_ok());
        assert!(ensure(&order, Transition::Cancel).is_ok());
    }

    #[test]
    fn test_delivered_order_cannot_be_cancelled() {
        let order = pending().delivered(Decimal::ONE, Utc::now());
        assert!(!can_cancel(&order));
        assert_eq!(
            ensure(&order, Transition::Cancel),
            Err(InvalidTransition {
                order_id: OrderId::new(11),
                from: OrderStatus::Delivered,
                attempted: Transition::Cancel,
            })
        );
    }

    #[test]
    fn test_cancelled_order_cannot_be_delivered() {
        let order = pending().cancelled();
        assert!(!can_deliver(&order));
        let err = ensure(&order, Transition::Deliver).unwrap_err();
        assert_eq!(err.from, OrderStatus::Cancelled);
        assert_eq!(err.to_string(), "cannot deliver order 11: order is cancelled");
    }

    #[test]
    fn test_terminal_states_reject_repeats() {
        let delivered = pending().delivered(Decimal::ONE, Utc::now());
        assert!(!can_deliver(&delivered));
        let cancelled = pending().cancelled();
        assert!(!can_cancel(&cancelled));
    }
}
