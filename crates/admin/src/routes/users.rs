//! User route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use emporium_core::UserId;

use crate::{
    db::Store,
    error::AppError,
    middleware::RequireAdmin,
    models::User,
    services::UserInput,
    state::AppState,
};

/// Result of a mirror rebuild.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildResult {
    pub user_id: UserId,
    pub entries: usize,
}

/// All accounts.
#[instrument(skip(_admin, state))]
pub async fn index<S: Store>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.accounts().list_users().await?))
}

/// Account detail, including its order mirror.
#[instrument(skip(_admin, state))]
pub async fn show<S: Store>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.accounts().get_user(id).await?))
}

/// Replace an account's name, email and admin flag.
#[instrument(skip(admin, state, input), fields(admin = %admin.id))]
pub async fn update<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<UserId>,
    Json(input): Json<UserInput>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.accounts().update_user(id, input).await?))
}

/// Delete an account and return it. Its orders are kept.
#[instrument(skip(admin, state), fields(admin = %admin.id))]
pub async fn destroy<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.accounts().delete_user(id).await?))
}

/// Regenerate the user's order mirror from the order collection.
#[instrument(skip(admin, state), fields(admin = %admin.id))]
pub async fn rebuild_orders<S: Store>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState<S>>,
    Path(id): Path<UserId>,
) -> Result<Json<RebuildResult>, AppError> {
    let entries = state.fulfillment().rebuild_mirror(id).await?;
    Ok(Json(RebuildResult {
        user_id: id,
        entries,
    }))
}
