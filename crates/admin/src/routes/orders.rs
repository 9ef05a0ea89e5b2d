//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::{OrderId, OrderStatus, UserId};

use crate::{
    db::Store,
    error::AppError,
    middleware::RequireAdmin,
    models::Order,
    services::{Deletion, Delivery},
    state::AppState,
};

/// An order with its derived status spelled out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status: OrderStatus,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            status: order.status(),
            order,
        }
    }
}

/// Body of `PATCH /order/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelInput {
    pub id: OrderId,
}

/// Body of `DELETE /order/delete`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteInput {
    pub order_id: OrderId,
    pub user_id: UserId,
}

/// All orders, newest first.
#[instrument(skip(_admin, state))]
pub async fn index<S: Store>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    let orders = state.fulfillment().list_orders().await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// Order detail.
#[instrument(skip(_admin, state))]
pub async fn show<S: Store>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>, AppError> {
    let order = state.fulfillment().get_order(id).await?;
    Ok(Json(order.into()))
}

/// Deliver an order: payment captured, stock moved to sold.
#[instrument(skip(admin, state), fields(admin = %admin.id))]
pub async fn deliver<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = state.fulfillment().deliver(id).await?;
    Ok(Json(delivery))
}

/// Finish a delivery that took the stock but failed to store the order.
/// The product is not written again.
#[instrument(skip(admin, state), fields(admin = %admin.id))]
pub async fn complete_delivery<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Delivery>, AppError> {
    Ok(Json(state.fulfillment().complete_delivery(id).await?))
}

/// Cancel a pending order.
#[instrument(skip(admin, state), fields(admin = %admin.id))]
pub async fn cancel<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Json(input): Json<CancelInput>,
) -> Result<Json<OrderView>, AppError> {
    let order = state.fulfillment().cancel(input.id).await?;
    Ok(Json(order.into()))
}

/// Delete an order in any state.
#[instrument(skip(admin, state), fields(admin = %admin.id))]
pub async fn destroy<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Json(input): Json<DeleteInput>,
) -> Result<Json<Deletion>, AppError> {
    let deletion = state
        .fulfillment()
        .delete_order(input.order_id, input.user_id)
        .await?;
    Ok(Json(deletion))
}
