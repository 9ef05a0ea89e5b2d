//! HTTP route handlers for admin.
//!
//! Every route except the health checks requires an admin session. Bodies
//! are JSON in both directions.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness
//! GET    /health/ready               - Readiness (store reachable)
//!
//! # Dashboard
//! GET    /                           - Dashboard metrics
//!
//! # Orders
//! GET    /order                      - All orders, newest first
//! GET    /order/{id}/details         - Order detail
//! PATCH  /order/{id}/deliver         - Deliver and capture payment
//! PATCH  /order/{id}/complete-delivery - Finish an interrupted delivery
//! PATCH  /order/cancel               - Cancel, body { "id" }
//! DELETE /order/delete               - Delete, body { "orderId", "userId" }
//!
//! # Products
//! GET    /product                    - Catalog listing
//! GET    /product/{id}/details       - Product detail
//! POST   /product/add                - Create (indexed for search)
//! POST   /product/{id}/edit          - Replace editable fields
//! DELETE /product/{id}/delete        - Delete
//!
//! # Users
//! GET    /user                       - All accounts
//! GET    /user/{id}/details          - Account with its order mirror
//! POST   /user/{id}/edit             - Replace name, email and admin flag
//! DELETE /user/{id}/delete           - Delete (orders are kept)
//! POST   /user/{id}/rebuild-orders   - Rebuild the order mirror
//! ```

pub mod dashboard;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::db::Store;
use crate::state::AppState;

/// Build the admin router.
pub fn routes<S: Store + Clone>() -> Router<AppState<S>> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
        // Dashboard
        .route("/", get(dashboard::index::<S>))
        // Orders
        .route("/order", get(orders::index::<S>))
        .route("/order/{id}/details", get(orders::show::<S>))
        .route("/order/{id}/deliver", patch(orders::deliver::<S>))
        .route(
            "/order/{id}/complete-delivery",
            patch(orders::complete_delivery::<S>),
        )
        .route("/order/cancel", patch(orders::cancel::<S>))
        .route("/order/delete", delete(orders::destroy::<S>))
        // Products
        .route("/product", get(products::index::<S>))
        .route("/product/{id}/details", get(products::show::<S>))
        .route("/product/add", post(products::create::<S>))
        .route("/product/{id}/edit", post(products::update::<S>))
        .route("/product/{id}/delete", delete(products::destroy::<S>))
        // Users
        .route("/user", get(users::index::<S>))
        .route("/user/{id}/details", get(users::show::<S>))
        .route("/user/{id}/edit", post(users::update::<S>))
        .route("/user/{id}/delete", delete(users::destroy::<S>))
        .route("/user/{id}/rebuild-orders", post(users::rebuild_orders::<S>))
}
