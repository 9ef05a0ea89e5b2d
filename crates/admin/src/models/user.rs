//! Customer and admin account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::{OrderId, ProductId, UserId};

/// A storefront account.
///
/// `orders` is a denormalized copy of the user's orders kept for the account
/// page. The `orders` collection stays authoritative; the mirror is a cache
/// that can always be rebuilt from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email address.
    pub email: String,
    /// Whether the account may use the admin console.
    pub admin: bool,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
    /// Mirror of the user's orders, in checkout order.
    pub orders: Vec<OrderSummary>,
}

/// The slice of an order cached inside its owner's account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// ID of the authoritative order.
    pub id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub ordered_at: DateTime<Utc>,
    /// Mirrors `Order::delivered_at`.
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Fields for an account that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub admin: bool,
}
