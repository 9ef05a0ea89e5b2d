//! Persistence for products, orders and users.
//!
//! # Collections
//!
//! - `shop.product` - catalog entries with stock and sold counters
//! - `shop.customer_order` - authoritative order records
//! - `shop.app_user` - accounts, with the embedded order mirror as JSONB
//! - `shop.session` - tower-sessions storage shared with the storefront
//!
//! The fulfillment engine only sees the [`Store`] trait. [`PgStore`] is the
//! production backend; [`MemoryStore`] backs tests and local experiments.
//!
//! # Migrations
//!
//! Migrations live in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use emporium_core::{OrderId, ProductId, UserId};

use crate::models::{NewOrder, NewProduct, NewUser, Order, Product, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The backend refused the operation (connection lost, injected fault).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Document-style persistence for the three entity types.
///
/// `find_*` return `Ok(None)` for a missing entity. `save_*` overwrite an
/// existing record and fail with [`RepositoryError::NotFound`] when there is
/// nothing to overwrite. `delete_*` return the removed record.
pub trait Store: Send + Sync + 'static {
    /// Check that the backend is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    fn insert_product(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    fn save_product(
        &self,
        product: &Product,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn delete_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// All products, oldest first.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    fn find_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    fn insert_order(
        &self,
        order: NewOrder,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    fn save_order(&self, order: &Order)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn delete_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// All orders, oldest first.
    fn list_orders(&self) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// One user's orders, oldest first.
    fn list_orders_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    fn find_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn insert_user(
        &self,
        user: NewUser,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// Replace a stored user. An email taken by another account is a
    /// `Conflict`.
    fn save_user(&self, user: &User) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a user and return it. The user's orders are left in place.
    fn delete_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// All users, oldest first.
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// Number of non-admin accounts.
    fn count_customers(&self) -> impl Future<Output = Result<usize, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
