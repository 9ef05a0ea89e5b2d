//! Dashboard route handler.

use std::collections::HashMap;

use axum::{Json, extract::State};
use chrono::Utc;
use tracing::instrument;

use crate::{
    db::Store,
    error::AppError,
    middleware::RequireAdmin,
    services::{DashboardMetrics, compute_dashboard_metrics},
    state::AppState,
};

/// Dashboard metrics over the current order snapshot.
#[instrument(skip(admin, state), fields(admin = %admin.id))]
pub async fn index<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
) -> Result<Json<DashboardMetrics>, AppError> {
    let store = state.store();
    let orders = store.list_orders().await?;
    let products: HashMap<_, _> = store
        .list_products()
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let total_customers = store.count_customers().await?;

    Ok(Json(compute_dashboard_metrics(
        &orders,
        &products,
        total_customers,
        Utc::now(),
    )))
}
