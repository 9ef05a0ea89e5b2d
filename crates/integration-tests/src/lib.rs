//! Integration tests for Emporium.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process scenarios (no services needed)
//! cargo test -p emporium-integration-tests
//!
//! # Including the PostgreSQL store tests
//! DATABASE_URL=postgres://localhost/emporium_test \
//!     cargo test -p emporium-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `fulfillment` - deliver, cancel and delete across the three collections
//! - `concurrency` - many tasks racing on the same orders and products
//! - `partial_failure` - injected storage faults between writes
//! - `search_index` - the HTTP search client against a local stand-in
//! - `postgres_store` - [`PgStore`](emporium_admin::db::PgStore) against a real database
//!
//! The helpers here wrap [`MemoryStore`] with fault and latency injection and
//! seed the records a checkout would have created.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use emporium_admin::db::{MemoryStore, RepositoryError, Store};
use emporium_admin::models::{
    NewOrder, NewProduct, NewUser, Order, OrderSummary, Product, User,
};
use emporium_core::{OrderId, ProductId, UserId};

/// Store calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    FindUser,
    SaveUser,
    SaveProduct,
    SaveOrder,
    DeleteOrder,
}

#[derive(Debug, Default)]
struct Faults {
    armed: HashSet<Fault>,
    latency: Option<Duration>,
}

/// A [`MemoryStore`] that fails armed operations and can slow down writes.
///
/// Clones share both the data and the armed faults.
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    faults: Arc<Mutex<Faults>>,
}

impl FlakyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying store, for assertions that must bypass faults.
    #[must_use]
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Make every call of `fault` fail until [`FlakyStore::heal`].
    pub fn arm(&self, fault: Fault) {
        self.faults().armed.insert(fault);
    }

    pub fn heal(&self) {
        self.faults().armed.clear();
    }

    /// Sleep before every write, widening race windows.
    pub fn set_latency(&self, latency: Duration) {
        self.faults().latency = Some(latency);
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn check(&self, fault: Fault) -> Result<(), RepositoryError> {
        let (armed, latency) = {
            let faults = self.faults();
            (faults.armed.contains(&fault), faults.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if armed {
            return Err(RepositoryError::Unavailable(format!("injected {fault:?} fault")));
        }
        Ok(())
    }
}

impl Store for FlakyStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.ping().await
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.inner.find_product(id).await
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        self.inner.insert_product(product).await
    }

    async fn save_product(&self, product: &Product) -> Result<(), RepositoryError> {
        self.check(Fault::SaveProduct).await?;
        self.inner.save_product(product).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.inner.delete_product(id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.inner.list_products().await
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.inner.find_order(id).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.inner.insert_order(order).await
    }

    async fn save_order(&self, order: &Order) -> Result<(), RepositoryError> {
        self.check(Fault::SaveOrder).await?;
        self.inner.save_order(order).await
    }

    async fn delete_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.check(Fault::DeleteOrder).await?;
        self.inner.delete_order(id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        self.inner.list_orders().await
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.inner.list_orders_for_user(user_id).await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        if self.faults().armed.contains(&Fault::FindUser) {
            return Err(RepositoryError::Unavailable("injected FindUser fault".to_string()));
        }
        self.inner.find_user(id).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.inner.insert_user(user).await
    }

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError> {
        self.check(Fault::SaveUser).await?;
        self.inner.save_user(user).await
    }

    async fn delete_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.delete_user(id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        self.inner.list_users().await
    }

    async fn count_customers(&self) -> Result<usize, RepositoryError> {
        self.inner.count_customers().await
    }
}

// =============================================================================
// Seeding
// =============================================================================

/// Create a customer account.
///
/// # Errors
///
/// Propagates store errors.
pub async fn seed_user<S: Store>(store: &S, name: &str) -> Result<User, RepositoryError> {
    store
        .insert_user(NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            admin: false,
        })
        .await
}

/// Create a product priced at 10.00 with 18% tax.
///
/// # Errors
///
/// Propagates store errors.
pub async fn seed_product<S: Store>(store: &S, quantity: u32) -> Result<Product, RepositoryError> {
    store
        .insert_product(NewProduct {
            category: "cameras".to_string(),
            name: "Rangefinder".to_string(),
            price: Decimal::new(1000, 2),
            tax_rate: Decimal::new(18, 2),
            quantity,
            images: vec!["front.jpg".to_string()],
            specs: serde_json::json!({ "film": "35mm" }),
        })
        .await
}

/// Record an order the way checkout does: the order itself plus an entry in
/// the buyer's mirror.
///
/// # Errors
///
/// Propagates store errors; `NotFound` if the user or product is missing.
pub async fn place_order<S: Store>(
    store: &S,
    user_id: UserId,
    product_id: ProductId,
    quantity: u32,
) -> Result<Order, RepositoryError> {
    let product = store
        .find_product(product_id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    let order = store
        .insert_order(NewOrder {
            user_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        })
        .await?;

    let mut user = store.find_user(user_id).await?.ok_or(RepositoryError::NotFound)?;
    user.orders.push(OrderSummary::from_order(&order, &product.name));
    store.save_user(&user).await?;
    Ok(order)
}
