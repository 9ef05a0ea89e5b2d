//! Order lifecycle status.
//!
//! The status is never stored. It is derived from an order's delivery
//! timestamp and its not-cancelled flag, so the stored record cannot disagree
//! with it.

use serde::{Deserialize, Serialize};

/// Derived lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed at checkout, neither delivered nor cancelled.
    Pending,
    /// Delivered and paid. Terminal.
    Delivered,
    /// Cancelled before delivery. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Derive the status from the two stored lifecycle fields.
    ///
    /// A delivered order reports `Delivered` even if its cancellation flag was
    /// cleared by an external write; delivery wins because stock has already
    /// left the warehouse.
    #[must_use]
    pub const fn derive(delivered: bool, not_cancelled: bool) -> Self {
        if delivered {
            Self::Delivered
        } else if not_cancelled {
            Self::Pending
        } else {
            Self::Cancelled
        }
    }

    /// Whether no further lifecycle transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Lowercase label used in logs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
