//! Sync for the order mirror embedded in each user record.
//!
//! The mirror is a cache for the account page. Orders stay authoritative, so
//! a missing entry is logged and tolerated, and [`rebuild_mirror`] can always
//! regenerate the whole list.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use emporium_core::{OrderId, ProductId};

use crate::models::{Order, OrderSummary, Product, User};

impl OrderSummary {
    /// Summary of `order` as shown on its owner's account page.
    #[must_use]
    pub fn from_order(order: &Order, product_name: &str) -> Self {
        Self {
            id: order.id,
            product_id: order.product_id,
            product_name: product_name.to_string(),
            quantity: order.quantity,
            ordered_at: order.created_at,
            delivered_at: order.delivered_at,
        }
    }
}

/// Record a delivery on the user's mirror entry for `order_id`.
///
/// Returns `false` (and logs a warning) when the user has no entry for the
/// order; the delivery itself still stands.
pub fn reflect_delivery(user: &mut User, order_id: OrderId, delivered_at: DateTime<Utc>) -> bool {
    if let Some(entry) = user.orders.iter_mut().find(|entry| entry.id == order_id) {
        entry.delivered_at = Some(delivered_at);
        true
    } else {
        warn!(
            user_id = %user.id,
            order_id = %order_id,
            "Order missing from user's order mirror, mirror needs a rebuild"
        );
        false
    }
}

/// Remove the mirror entry for `order_id`. Removing an absent entry is a no-op.
///
/// Returns whether an entry was removed.
pub fn remove_entry(user: &mut User, order_id: OrderId) -> bool {
    let before = user.orders.len();
    user.orders.retain(|entry| entry.id != order_id);
    let removed = user.orders.len() != before;
    if !removed {
        debug!(user_id = %user.id, order_id = %order_id, "No mirror entry to remove");
    }
    removed
}

/// Replace the user's mirror with summaries of `orders`.
///
/// Only orders owned by `user` are kept, oldest first. Product names come from
/// `products`; a product deleted from the catalog keeps the name the old
/// mirror entry had, or an empty name if there was none.
pub fn rebuild_mirror(user: &mut User, orders: &[Order], products: &HashMap<ProductId, Product>) {
    let previous_names: HashMap<OrderId, String> = user
        .orders
        .drain(..)
        .map(|entry| (entry.id, entry.product_name))
        .collect();

    let mut owned: Vec<&Order> = orders.iter().filter(|o| o.user_id == user.id).collect();
    owned.sort_by_key(|o| (o.created_at, o.id));

    user.orders = owned
        .into_iter()
        .map(|order| {
            let name = products
                .get(&order.product_id)
                .map(|p| p.name.as_str())
                .or_else(|| previous_names.get(&order.id).map(String::as_str))
                .unwrap_or_default();
            OrderSummary::from_order(order, name)
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use emporium_core::UserId;
    use rust_decimal::Decimal;

    fn user_with(entries: &[i64]) -> User {
        User {
            id: UserId::new(1),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            admin: false,
            created_at: Utc::now(),
            orders: entries
                .iter()
                .map(|&id| OrderSummary {
                    id: OrderId::new(id),
                    product_id: ProductId::new(100),
                    product_name: "Old name".to_string(),
                    quantity: 1,
                    ordered_at: Utc::now(),
                    delivered_at: None,
                })
                .collect(),
        }
    }

    fn order(id: i64, user: i64, minutes_ago: i64) -> Order {
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(user),
            product_id: ProductId::new(100),
            quantity: 2,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            paid_at: None,
            amount_paid: None,
            delivered_at: None,
            not_cancelled: true,
        }
    }

    #[test]
    fn test_reflect_delivery_updates_matching_entry_only() {
        let mut user = user_with(&[5, 6]);
        let at = Utc::now();
        assert!(reflect_delivery(&mut user, OrderId::new(6), at));
        assert_eq!(user.orders[0].delivered_at, None);
        assert_eq!(user.orders[1].delivered_at, Some(at));
    }

    #[test]
    fn test_reflect_delivery_tolerates_missing_entry() {
        let mut user = user_with(&[5]);
        let before = user.clone();
        assert!(!reflect_delivery(&mut user, OrderId::new(9), Utc::now()));
        assert_eq!(user, before);
    }

    #[test]
    fn test_remove_entry_is_idempotent() {
        let mut user = user_with(&[5, 6]);
        assert!(remove_entry(&mut user, OrderId::new(5)));
        assert!(!remove_entry(&mut user, OrderId::new(5)));
        assert_eq!(user.orders.len(), 1);
        assert_eq!(user.orders[0].id, OrderId::new(6));
    }

    #[test]
    fn test_rebuild_restores_authoritative_view() {
        let mut user = user_with(&[5, 42]);
        let delivered = order(6, 1, 5).delivered(Decimal::ONE, Utc::now());
        let orders = vec![order(5, 1, 10), delivered.clone(), order(7, 2, 1)];

        rebuild_mirror(&mut user, &orders, &HashMap::new());

        let ids: Vec<OrderId> = user.orders.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![OrderId::new(5), OrderId::new(6)]);
        assert_eq!(user.orders[0].product_name, "Old name");
        assert_eq!(user.orders[1].product_name, "");
        assert_eq!(user.orders[1].delivered_at, delivered.delivered_at);
    }
}
