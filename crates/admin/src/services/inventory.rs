//! Inventory ledger.
//!
//! Stock rules for delivery and the income formula shared by payment capture
//! and dashboard reporting. Everything here is pure so the fulfillment
//! coordinator can check feasibility before touching storage.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use emporium_core::ProductId;

use crate::models::{Order, Product};

/// Delivery asked for more units than are on hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient stock for product {product_id}: requested {requested}, on hand {on_hand}")]
pub struct InsufficientStock {
    pub product_id: ProductId,
    pub requested: u32,
    pub on_hand: u32,
}

/// Stock counters after a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockReservation {
    pub quantity: u32,
    pub sold: u32,
}

impl StockReservation {
    /// The product with the reserved counters applied.
    #[must_use]
    pub fn apply(self, product: Product) -> Product {
        Product {
            quantity: self.quantity,
            sold: self.sold,
            ..product
        }
    }
}

/// Compute the counters a delivery of `quantity` units would leave behind.
///
/// # Errors
///
/// Returns [`InsufficientStock`] if fewer than `quantity` units are on hand.
pub fn reserve_for_delivery(
    product: &Product,
    quantity: u32,
) -> Result<StockReservation, InsufficientStock> {
    let insufficient = || InsufficientStock {
        product_id: product.id,
        requested: quantity,
        on_hand: product.quantity,
    };

    let remaining = product.quantity.checked_sub(quantity).ok_or_else(insufficient)?;
    let sold = product.sold.checked_add(quantity).ok_or_else(insufficient)?;

    Ok(StockReservation {
        quantity: remaining,
        sold,
    })
}

/// Amount charged for an order: `quantity * price * (1 + tax_rate)`, rounded
/// half away from zero to whole cents, the scale `amount_paid` is stored at.
///
/// Payment capture and the dashboard both call this, so the amount charged
/// and the amount reported cannot drift apart.
#[must_use]
pub fn derive_income(order: &Order, product: &Product) -> Decimal {
    (Decimal::from(order.quantity) * product.price * (Decimal::ONE + product.tax_rate))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use emporium_core::{OrderId, UserId};

    fn product(quantity: u32, sold: u32) -> Product {
        Product {
            id: ProductId::new(1),
            category: "laptops".to_string(),
            name: "Notebook".to_string(),
            price: Decimal::new(10_000, 2),
            tax_rate: Decimal::new(18, 2),
            quantity,
            sold,
            images: vec![],
            specs: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    fn order(quantity: u32) -> Order {
        Order {
            id: OrderId::new(7),
            user_id: UserId::new(2),
            product_id: ProductId::new(1),
            quantity,
            created_at: Utc::now(),
            paid_at: None,
            amount_paid: None,
            delivered_at: None,
            not_cancelled: true,
        }
    }

    #[test]
    fn test_reserve_moves_units_from_stock_to_sold() {
        let reservation = reserve_for_delivery(&product(5, 0), 3).unwrap();
        assert_eq!(
            reservation,
            StockReservation {
                quantity: 2,
                sold: 3
            }
        );
    }

    #[test]
    fn test_reserve_entire_stock() {
        let reservation = reserve_for_delivery(&product(4, 10), 4).unwrap();
        assert_eq!(reservation.quantity, 0);
        assert_eq!(reservation.sold, 14);
    }

    #[test]
    fn test_reserve_rejects_overdraw() {
        let before = product(2, 3);
        let err = reserve_for_delivery(&before, 10).unwrap_err();
        assert_eq!(err.requested, 10);
        assert_eq!(err.on_hand, 2);
        assert_eq!(before.quantity, 2);
        assert_eq!(before.sold, 3);
    }

    #[test]
    fn test_reserve_never_goes_negative() {
        for on_hand in 0..6 {
            for requested in 0..8 {
                match reserve_for_delivery(&product(on_hand, 0), requested) {
                    Ok(r) => assert_eq!(r.quantity + requested, on_hand),
                    Err(_) => assert!(requested > on_hand),
                }
            }
        }
    }

    #[test]
    fn test_apply_keeps_other_fields() {
        let before = product(5, 0);
        let after = reserve_for_delivery(&before, 3).unwrap().apply(before.clone());
        assert_eq!(after.quantity, 2);
        assert_eq!(after.sold, 3);
        assert_eq!(after.name, before.name);
        assert_eq!(after.price, before.price);
    }

    #[test]
    fn test_income_includes_tax() {
        // 2 * 100.00 * 1.18
        assert_eq!(
            derive_income(&order(2), &product(5, 0)),
            Decimal::new(23_600, 2)
        );
    }

    #[test]
    fn test_income_is_linear_in_quantity() {
        let p = product(5, 0);
        let one = derive_income(&order(1), &p);
        assert_eq!(derive_income(&order(2), &p), one * Decimal::TWO);
        assert_eq!(derive_income(&order(7), &p), one * Decimal::from(7));
    }

    #[test]
    fn test_income_rounds_to_cents() {
        let p = Product {
            price: Decimal::new(1_999, 2),
            tax_rate: Decimal::new(825, 4),
            ..product(5, 0)
        };
        // 3 * 19.99 * 1.0825 = 64.917525
        let income = derive_income(&order(3), &p);
        assert_eq!(income, Decimal::new(6_492, 2));
        assert_eq!(income.scale(), 2);

        // 1 * 0.10 * 1.05 = 0.105, a midpoint
        let p = Product {
            price: Decimal::new(10, 2),
            tax_rate: Decimal::new(5, 2),
            ..product(5, 0)
        };
        assert_eq!(derive_income(&order(1), &p), Decimal::new(11, 2));
    }
}
