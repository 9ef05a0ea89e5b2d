//! Dashboard metrics.
//!
//! Everything is computed in one pass over an order snapshot. The snapshot
//! may be stale by one in-flight fulfillment call; that is fine for a
//! dashboard.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::{OrderStatus, ProductId};

use super::inventory::derive_income;
use crate::models::{Order, Product};

/// Figures shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Income paid in the current calendar month.
    pub monthly_income: Decimal,
    /// Income paid in the current calendar year.
    pub yearly_income: Decimal,
    /// Share of all orders that have been delivered, rounded to a whole percent.
    pub delivery_rate_percent: u32,
    pub pending_orders: usize,
    /// Income per payment month, January first.
    ///
    /// Bucketed by month only, so payments from different years land in the
    /// same bucket.
    pub twelve_month_series: [Decimal; 12],
    /// Non-admin accounts.
    pub total_customers: usize,
}

/// Compute dashboard metrics as of `now`.
///
/// Income of an order is [`derive_income`] against its product in
/// `products`; orders whose product is gone contribute nothing.
#[must_use]
pub fn compute_dashboard_metrics(
    orders: &[Order],
    products: &HashMap<ProductId, Product>,
    total_customers: usize,
    now: DateTime<Utc>,
) -> DashboardMetrics {
    let mut monthly_income = Decimal::ZERO;
    let mut yearly_income = Decimal::ZERO;
    let mut twelve_month_series = [Decimal::ZERO; 12];
    let mut delivered = 0_usize;
    let mut pending_orders = 0_usize;

    for order in orders {
        match order.status() {
            OrderStatus::Delivered => delivered += 1,
            OrderStatus::Pending => pending_orders += 1,
            OrderStatus::Cancelled => {}
        }

        let (Some(paid_at), Some(product)) = (order.paid_at, products.get(&order.product_id))
        else {
            continue;
        };
        let income = derive_income(order, product);

        if paid_at.year() == now.year() {
            yearly_income += income;
            if paid_at.month() == now.month() {
                monthly_income += income;
            }
        }
        if let Some(bucket) = twelve_month_series.get_mut(paid_at.month0() as usize) {
            *bucket += income;
        }
    }

    DashboardMetrics {
        monthly_income,
        yearly_income,
        delivery_rate_percent: delivery_rate(delivered, orders.len()),
        pending_orders,
        twelve_month_series,
        total_customers,
    }
}

/// `round(100 * delivered / total)`, halves rounded up; 0 when there are no
/// orders.
fn delivery_rate(delivered: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let percent = (200 * delivered + total) / (2 * total);
    u32::try_from(percent).unwrap_or(100)
}
