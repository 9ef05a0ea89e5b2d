//! Order repair.
//!
//! When a delivery stores the product but not the order, the server refuses
//! to deliver that order again until it is completed. After a server restart
//! that refusal is gone, and the reconciliation id in the error log is what
//! names the order. Complete it here before anyone redelivers it.
//!
//! Like `mirror rebuild`, this takes locks in this process only. Run it with
//! the admin server stopped, or use `PATCH /order/{id}/complete-delivery`.

use emporium_admin::services::FulfillmentCoordinator;
use emporium_core::OrderId;

use super::{CommandError, connect};

/// Mark `id` delivered and paid and update its owner's mirror. Stock is
/// left as stored.
///
/// # Errors
///
/// Returns `Fulfillment` if the order is missing or cancelled, or if a write
/// fails.
pub async fn complete_delivery(id: OrderId) -> Result<(), CommandError> {
    let (_config, store) = connect().await?;

    let delivery = FulfillmentCoordinator::new(store)
        .complete_delivery(id)
        .await?;

    tracing::info!(
        order_id = %id,
        amount_paid = ?delivery.order.amount_paid,
        mirror_updated = delivery.mirror_updated,
        "Delivery completed"
    );
    Ok(())
}
