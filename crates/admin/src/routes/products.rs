//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use emporium_core::ProductId;

use crate::{
    db::Store,
    error::AppError,
    middleware::RequireAdmin,
    models::Product,
    services::ProductInput,
    state::AppState,
};

/// Catalog listing.
#[instrument(skip(_admin, state))]
pub async fn index<S: Store>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.catalog().list_products().await?))
}

/// Product detail.
#[instrument(skip(_admin, state))]
pub async fn show<S: Store>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().get_product(id).await?))
}

/// Add a product. The search index is updated in the background.
#[instrument(skip(admin, state, input), fields(admin = %admin.id))]
pub async fn create<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state.catalog().create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's editable fields.
#[instrument(skip(admin, state, input), fields(admin = %admin.id))]
pub async fn update<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().update_product(id, input).await?))
}

/// Delete a product and return it.
#[instrument(skip(admin, state), fields(admin = %admin.id))]
pub async fn destroy<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().delete_product(id).await?))
}
