//! Fulfillment coordinator.
//!
//! Delivering, cancelling and deleting an order touch up to three separately
//! stored records: the order, the owner's order mirror and the product's
//! stock counters. There is no cross-record transaction, so the coordinator
//! checks everything that can be checked before the first write, then writes
//! in a fixed sequence:
//!
//! | Operation | Writes, in order                    |
//! |-----------|-------------------------------------|
//! | deliver   | user, product, order                |
//! | cancel    | order                               |
//! | delete    | order (delete), user                |
//! | complete  | order, user                         |
//!
//! A failed first write leaves nothing changed and surfaces as
//! [`FulfillmentError::Storage`]. A failure after that surfaces as
//! [`FulfillmentError::PartialFailure`] with a reconciliation id that is also
//! logged, so the affected records can be found and repaired.
//!
//! A delivery whose product write landed but whose order write failed has
//! already taken the stock. Such an order is held: `deliver` and `cancel`
//! refuse it with [`FulfillmentError::AwaitingCompletion`] until
//! [`FulfillmentCoordinator::complete_delivery`] writes the order without
//! touching the product again. The hold is kept in memory, like the
//! locks, so after a restart the reconciliation id in the error log is what
//! names orders to complete.
//!
//! Work on one order is serialized with a per-order lock. Locks are always
//! taken order, then user, then product.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use emporium_core::{OrderId, ProductId, UserId};

use super::inventory::{self, InsufficientStock};
use super::lifecycle::{self, InvalidTransition, Transition};
use super::locks::KeyedLocks;
use super::mirror;
use crate::db::{RepositoryError, Store};
use crate::models::{Order, Product, User};

// =============================================================================
// Errors
// =============================================================================

/// Kind of record an operation could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Order,
    User,
    Product,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Order => f.write_str("order"),
            Self::User => f.write_str("user"),
            Self::Product => f.write_str("product"),
        }
    }
}

/// Fulfillment operation, as named in failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Deliver,
    Cancel,
    Delete,
    CompleteDelivery,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deliver => f.write_str("deliver"),
            Self::Cancel => f.write_str("cancel"),
            Self::Delete => f.write_str("delete"),
            Self::CompleteDelivery => f.write_str("complete_delivery"),
        }
    }
}

/// A single storage step of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    SaveUser,
    SaveProduct,
    SaveOrder,
    DeleteOrder,
    LoadUser,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SaveUser => "save_user",
            Self::SaveProduct => "save_product",
            Self::SaveOrder => "save_order",
            Self::DeleteOrder => "delete_order",
            Self::LoadUser => "load_user",
        };
        f.write_str(name)
    }
}

/// Errors returned by the coordinator.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error(transparent)]
    InsufficientStock(#[from] InsufficientStock),

    /// Nothing was written; the operation can be retried.
    #[error("storage error: {0}")]
    Storage(#[source] RepositoryError),

    /// Some writes landed and a later one failed. Not retryable as a whole.
    #[error(
        "{operation} of order {order_id} partially applied: {failed_step} failed \
         (reconciliation id {reconciliation_id})"
    )]
    PartialFailure {
        operation: Operation,
        order_id: OrderId,
        completed: Vec<Step>,
        failed_step: Step,
        reconciliation_id: Uuid,
        #[source]
        source: RepositoryError,
    },

    /// An earlier delivery took the stock but did not store the order.
    /// Only [`FulfillmentCoordinator::complete_delivery`] may proceed.
    #[error(
        "order {order_id} awaits delivery completion (reconciliation id {reconciliation_id})"
    )]
    AwaitingCompletion {
        order_id: OrderId,
        reconciliation_id: Uuid,
    },
}

impl FulfillmentError {
    const fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of a successful delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub order: Order,
    pub product: Product,
    /// False when the owner's mirror had no entry for the order.
    pub mirror_updated: bool,
}

/// Outcome of a successful deletion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deletion {
    pub order: Order,
    pub mirror_entry_removed: bool,
}

// =============================================================================
// Write sequencing
// =============================================================================

/// Tracks the writes of one operation so a failure can say what landed.
struct WriteLog {
    operation: Operation,
    order_id: OrderId,
    completed: Vec<Step>,
}

impl WriteLog {
    const fn new(operation: Operation, order_id: OrderId) -> Self {
        Self {
            operation,
            order_id,
            completed: Vec::new(),
        }
    }

    async fn run(
        &mut self,
        step: Step,
        write: impl Future<Output = Result<(), RepositoryError>>,
    ) -> Result<(), FulfillmentError> {
        match write.await {
            Ok(()) => {
                self.completed.push(step);
                Ok(())
            }
            Err(source) => Err(self.fail(step, source)),
        }
    }

    fn fail(&self, failed_step: Step, source: RepositoryError) -> FulfillmentError {
        if self.completed.is_empty() {
            warn!(
                operation = %self.operation,
                order_id = %self.order_id,
                step = %failed_step,
                error = %source,
                "Write failed before any change was stored"
            );
            return FulfillmentError::Storage(source);
        }

        let reconciliation_id = Uuid::new_v4();
        error!(
            operation = %self.operation,
            order_id = %self.order_id,
            completed = ?self.completed,
            failed_step = %failed_step,
            reconciliation_id = %reconciliation_id,
            error = %source,
            "Fulfillment partially applied, records need reconciliation"
        );
        FulfillmentError::PartialFailure {
            operation: self.operation,
            order_id: self.order_id,
            completed: self.completed.clone(),
            failed_step,
            reconciliation_id,
            source,
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Orchestrates order lifecycle changes across orders, users and products.
///
/// The user and product locks are shared with the account and catalog
/// services, which rewrite the same records.
#[derive(Debug)]
pub struct FulfillmentCoordinator<S> {
    store: S,
    order_locks: KeyedLocks<OrderId>,
    user_locks: Arc<KeyedLocks<UserId>>,
    product_locks: Arc<KeyedLocks<ProductId>>,
    /// Orders whose stock was taken by a delivery that never stored the
    /// order, with the reconciliation id of that failure.
    held: Mutex<HashMap<OrderId, Uuid>>,
}

impl<S: Store> FulfillmentCoordinator<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            order_locks: KeyedLocks::new(),
            user_locks: Arc::new(KeyedLocks::new()),
            product_locks: Arc::new(KeyedLocks::new()),
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Handle to the per-user locks.
    #[must_use]
    pub fn user_locks(&self) -> Arc<KeyedLocks<UserId>> {
        Arc::clone(&self.user_locks)
    }

    /// Handle to the per-product locks.
    #[must_use]
    pub fn product_locks(&self) -> Arc<KeyedLocks<ProductId>> {
        Arc::clone(&self.product_locks)
    }

    fn held(&self) -> std::sync::MutexGuard<'_, HashMap<OrderId, Uuid>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse an order whose stock an earlier delivery already took.
    fn ensure_not_held(&self, order_id: OrderId) -> Result<(), FulfillmentError> {
        let held = self.held().get(&order_id).copied();
        match held {
            Some(reconciliation_id) => Err(FulfillmentError::AwaitingCompletion {
                order_id,
                reconciliation_id,
            }),
            None => Ok(()),
        }
    }

    /// Hold the order if `err` left its stock taken but the order unwritten.
    fn hold_if_stock_taken(&self, err: &FulfillmentError) {
        if let FulfillmentError::PartialFailure {
            operation: Operation::Deliver,
            order_id,
            completed,
            reconciliation_id,
            ..
        } = err
            && completed.contains(&Step::SaveProduct)
        {
            warn!(
                order_id = %order_id,
                reconciliation_id = %reconciliation_id,
                "Order held until its delivery is completed"
            );
            self.held().insert(*order_id, *reconciliation_id);
        }
    }

    async fn load_order(&self, id: OrderId) -> Result<Order, FulfillmentError> {
        self.store
            .find_order(id)
            .await
            .map_err(FulfillmentError::Storage)?
            .ok_or_else(|| FulfillmentError::not_found(Entity::Order, id.get()))
    }

    async fn load_user(&self, id: UserId) -> Result<User, FulfillmentError> {
        self.store
            .find_user(id)
            .await
            .map_err(FulfillmentError::Storage)?
            .ok_or_else(|| FulfillmentError::not_found(Entity::User, id.get()))
    }

    async fn load_product(&self, id: ProductId) -> Result<Product, FulfillmentError> {
        self.store
            .find_product(id)
            .await
            .map_err(FulfillmentError::Storage)?
            .ok_or_else(|| FulfillmentError::not_found(Entity::Product, id.get()))
    }

    /// Mark an order delivered and paid, moving its units from stock to sold.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order, its user or its product is missing
    /// - `InvalidTransition` unless the order is pending
    /// - `InsufficientStock` if the product has fewer units than ordered
    /// - `AwaitingCompletion` if an earlier delivery already took the stock
    /// - `Storage` if the first write fails
    /// - `PartialFailure` if a later write fails
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn deliver(&self, order_id: OrderId) -> Result<Delivery, FulfillmentError> {
        let _order_guard = self.order_locks.lock(&order_id).await;
        let order = self.load_order(order_id).await?;

        let _user_guard = self.user_locks.lock(&order.user_id).await;
        let _product_guard = self.product_locks.lock(&order.product_id).await;
        let mut user = self.load_user(order.user_id).await?;
        let product = self.load_product(order.product_id).await?;

        self.ensure_not_held(order_id)?;
        lifecycle::ensure(&order, Transition::Deliver)?;
        let reservation = inventory::reserve_for_delivery(&product, order.quantity)?;

        let now = Utc::now();
        let amount = inventory::derive_income(&order, &product);
        let order = order.delivered(amount, now);
        let product = reservation.apply(product);
        let mirror_updated = mirror::reflect_delivery(&mut user, order_id, now);

        let mut writes = WriteLog::new(Operation::Deliver, order_id);
        self.persist_delivery(&mut writes, &user, &product, &order)
            .await
            .inspect_err(|e| self.hold_if_stock_taken(e))?;

        info!(
            product_id = %product.id,
            quantity = order.quantity,
            amount_paid = %amount,
            remaining = product.quantity,
            "Order delivered"
        );

        Ok(Delivery {
            order,
            product,
            mirror_updated,
        })
    }

    async fn persist_delivery(
        &self,
        writes: &mut WriteLog,
        user: &User,
        product: &Product,
        order: &Order,
    ) -> Result<(), FulfillmentError> {
        writes.run(Step::SaveUser, self.store.save_user(user)).await?;
        writes
            .run(Step::SaveProduct, self.store.save_product(product))
            .await?;
        writes.run(Step::SaveOrder, self.store.save_order(order)).await
    }

    /// Finish a delivery whose stock change is already stored: mark the order
    /// delivered and paid and update the owner's mirror. The product is not
    /// written.
    ///
    /// Idempotent. An order that is already delivered keeps its timestamps
    /// and only has its mirror entry brought in line.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order, its user or its product is missing
    /// - `InvalidTransition` if the order was cancelled
    /// - `Storage` if the order cannot be saved
    /// - `PartialFailure` if the order was saved but the user was not
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn complete_delivery(&self, order_id: OrderId) -> Result<Delivery, FulfillmentError> {
        let _order_guard = self.order_locks.lock(&order_id).await;
        let order = self.load_order(order_id).await?;

        let _user_guard = self.user_locks.lock(&order.user_id).await;
        let mut user = self.load_user(order.user_id).await?;
        let product = self.load_product(order.product_id).await?;

        let (order, delivered_at) = match order.delivered_at {
            Some(at) => (order, at),
            None => {
                lifecycle::ensure(&order, Transition::Deliver)?;
                if !self.held().contains_key(&order_id) {
                    warn!("Completing a delivery this process has no failure recorded for");
                }
                let now = Utc::now();
                let amount = inventory::derive_income(&order, &product);
                (order.delivered(amount, now), now)
            }
        };
        let mirror_updated = mirror::reflect_delivery(&mut user, order_id, delivered_at);

        let mut writes = WriteLog::new(Operation::CompleteDelivery, order_id);
        writes.run(Step::SaveOrder, self.store.save_order(&order)).await?;
        self.held().remove(&order_id);
        writes.run(Step::SaveUser, self.store.save_user(&user)).await?;

        info!(product_id = %product.id, "Delivery completed");
        Ok(Delivery {
            order,
            product,
            mirror_updated,
        })
    }

    /// Cancel a pending order. Stock is not touched.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order is missing
    /// - `InvalidTransition` unless the order is pending
    /// - `AwaitingCompletion` if a delivery already took the stock
    /// - `Storage` if the order cannot be saved
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order, FulfillmentError> {
        let _order_guard = self.order_locks.lock(&order_id).await;
        let order = self.load_order(order_id).await?;
        lifecycle::ensure(&order, Transition::Cancel)?;
        self.ensure_not_held(order_id)?;

        let order = order.cancelled();
        let mut writes = WriteLog::new(Operation::Cancel, order_id);
        writes.run(Step::SaveOrder, self.store.save_order(&order)).await?;

        info!("Order cancelled");
        Ok(order)
    }

    /// Delete an order in any state and drop it from `user_id`'s mirror.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order is missing (nothing is changed)
    /// - `Storage` if the delete itself fails
    /// - `PartialFailure` if the order was deleted but the mirror could not
    ///   be updated, including when the user does not exist
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn delete_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Deletion, FulfillmentError> {
        let _order_guard = self.order_locks.lock(&order_id).await;
        let _user_guard = self.user_locks.lock(&user_id).await;

        let mut writes = WriteLog::new(Operation::Delete, order_id);
        let order = match self.store.delete_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return Err(FulfillmentError::not_found(Entity::Order, order_id.get())),
            Err(e) => return Err(writes.fail(Step::DeleteOrder, e)),
        };
        writes.completed.push(Step::DeleteOrder);
        self.held().remove(&order_id);

        if order.user_id != user_id {
            warn!(
                owner = %order.user_id,
                "Deleted order belongs to a different user than the one given"
            );
        }

        let mut user = match self.store.find_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(writes.fail(Step::LoadUser, RepositoryError::NotFound)),
            Err(e) => return Err(writes.fail(Step::LoadUser, e)),
        };

        let mirror_entry_removed = mirror::remove_entry(&mut user, order_id);
        writes.run(Step::SaveUser, self.store.save_user(&user)).await?;

        info!(status = %order.status(), "Order deleted");
        Ok(Deletion {
            order,
            mirror_entry_removed,
        })
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the orders cannot be listed.
    pub async fn list_orders(&self) -> Result<Vec<Order>, FulfillmentError> {
        let mut orders = self
            .store
            .list_orders()
            .await
            .map_err(FulfillmentError::Storage)?;
        orders.reverse();
        Ok(orders)
    }

    /// A single order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order is missing, `Storage` on backend errors.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, FulfillmentError> {
        self.load_order(order_id).await
    }

    /// Regenerate a user's order mirror from the order collection.
    ///
    /// Returns the number of entries in the rebuilt mirror.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user is missing, `Storage` on backend errors.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn rebuild_mirror(&self, user_id: UserId) -> Result<usize, FulfillmentError> {
        let _user_guard = self.user_locks.lock(&user_id).await;
        let mut user = self.load_user(user_id).await?;

        let orders = self
            .store
            .list_orders_for_user(user_id)
            .await
            .map_err(FulfillmentError::Storage)?;
        let products: HashMap<ProductId, Product> = self
            .store
            .list_products()
            .await
            .map_err(FulfillmentError::Storage)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        mirror::rebuild_mirror(&mut user, &orders, &products);
        self.store
            .save_user(&user)
            .await
            .map_err(FulfillmentError::Storage)?;

        info!(entries = user.orders.len(), "Order mirror rebuilt");
        Ok(user.orders.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewOrder, NewProduct, NewUser, OrderSummary};
    use emporium_core::OrderStatus;
    use rust_decimal::Decimal;

    struct Fixture {
        store: MemoryStore,
        coordinator: FulfillmentCoordinator<MemoryStore>,
        user: User,
        product: Product,
    }

    async fn fixture(stock: u32) -> Fixture {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                admin: false,
            })
            .await
            .unwrap();
        let product = store
            .insert_product(NewProduct {
                category: "phones".to_string(),
                name: "Phone".to_string(),
                price: Decimal::new(20_000, 2),
                tax_rate: Decimal::new(10, 2),
                quantity: stock,
                images: vec![],
                specs: serde_json::json!({}),
            })
            .await
            .unwrap();
        Fixture {
            coordinator: FulfillmentCoordinator::new(store.clone()),
            store,
            user,
            product,
        }
    }

    impl Fixture {
        async fn place_order(&self, quantity: u32) -> Order {
            let order = self
                .store
                .insert_order(NewOrder {
                    user_id: self.user.id,
                    product_id: self.product.id,
                    quantity,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
            let mut user = self.store.find_user(self.user.id).await.unwrap().unwrap();
            user.orders
                .push(OrderSummary::from_order(&order, &self.product.name));
            self.store.save_user(&user).await.unwrap();
            order
        }
    }

    #[tokio::test]
    async fn test_deliver_updates_all_three_records() {
        let fx = fixture(5).await;
        let order = fx.place_order(3).await;

        let delivery = fx.coordinator.deliver(order.id).await.unwrap();
        assert!(delivery.mirror_updated);
        assert_eq!(delivery.order.status(), OrderStatus::Delivered);
        // 3 * 200.00 * 1.10
        assert_eq!(delivery.order.amount_paid, Some(Decimal::new(66_000, 2)));

        let product = fx.store.find_product(fx.product.id).await.unwrap().unwrap();
        assert_eq!((product.quantity, product.sold), (2, 3));

        let stored = fx.store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.delivered_at, stored.paid_at);

        let user = fx.store.find_user(fx.user.id).await.unwrap().unwrap();
        assert_eq!(user.orders[0].delivered_at, stored.delivered_at);
    }

    #[tokio::test]
    async fn test_overdraw_changes_nothing() {
        let fx = fixture(2).await;
        let order = fx.place_order(10).await;

        let err = fx.coordinator.deliver(order.id).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InsufficientStock(_)));

        let product = fx.store.find_product(fx.product.id).await.unwrap().unwrap();
        assert_eq!((product.quantity, product.sold), (2, 0));
        let stored = fx.store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_second_delivery_is_rejected() {
        let fx = fixture(5).await;
        let order = fx.place_order(1).await;

        fx.coordinator.deliver(order.id).await.unwrap();
        let err = fx.coordinator.deliver(order.id).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::InvalidTransition(InvalidTransition {
                from: OrderStatus::Delivered,
                ..
            })
        ));

        let product = fx.store.find_product(fx.product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 4);
    }

    #[tokio::test]
    async fn test_deliver_missing_order() {
        let fx = fixture(5).await;
        let err = fx.coordinator.deliver(OrderId::new(999)).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::NotFound {
                entity: Entity::Order,
                id: 999
            }
        ));
    }

    #[tokio::test]
    async fn test_deliver_without_mirror_entry_still_succeeds() {
        let fx = fixture(5).await;
        let order = fx.place_order(1).await;
        let mut user = fx.store.find_user(fx.user.id).await.unwrap().unwrap();
        user.orders.clear();
        fx.store.save_user(&user).await.unwrap();

        let delivery = fx.coordinator.deliver(order.id).await.unwrap();
        assert!(!delivery.mirror_updated);
    }

    #[tokio::test]
    async fn test_cancel_leaves_inventory_alone() {
        let fx = fixture(5).await;
        let order = fx.place_order(2).await;

        let cancelled = fx.coordinator.cancel(order.id).await.unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);

        let product = fx.store.find_product(fx.product.id).await.unwrap().unwrap();
        assert_eq!((product.quantity, product.sold), (5, 0));

        let err = fx.coordinator.deliver(order.id).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_cancel_delivered_order_fails() {
        let fx = fixture(5).await;
        let order = fx.place_order(2).await;
        fx.coordinator.deliver(order.id).await.unwrap();

        let err = fx.coordinator.cancel(order.id).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_order_and_mirror_entry() {
        let fx = fixture(5).await;
        let order = fx.place_order(1).await;

        let deletion = fx.coordinator.delete_order(order.id, fx.user.id).await.unwrap();
        assert!(deletion.mirror_entry_removed);
        assert!(fx.store.find_order(order.id).await.unwrap().is_none());
        let user = fx.store.find_user(fx.user.id).await.unwrap().unwrap();
        assert!(user.orders.is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_missing_user_is_partial() {
        let fx = fixture(5).await;
        let order = fx.place_order(1).await;

        let err = fx
            .coordinator
            .delete_order(order.id, UserId::new(4242))
            .await
            .unwrap_err();
        match err {
            FulfillmentError::PartialFailure {
                operation,
                completed,
                failed_step,
                ..
            } => {
                assert_eq!(operation, Operation::Delete);
                assert_eq!(completed, vec![Step::DeleteOrder]);
                assert_eq!(failed_step, Step::LoadUser);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert!(fx.store.find_order(order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_order_is_not_found() {
        let fx = fixture(5).await;
        let err = fx
            .coordinator
            .delete_order(OrderId::new(31), fx.user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::NotFound { entity: Entity::Order, .. }));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let fx = fixture(5).await;
        let first = fx.place_order(1).await;
        let second = fx.place_order(1).await;

        let orders = fx.coordinator.list_orders().await.unwrap();
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_rebuild_mirror_restores_dropped_entry() {
        let fx = fixture(5).await;
        let order = fx.place_order(1).await;
        let mut user = fx.store.find_user(fx.user.id).await.unwrap().unwrap();
        user.orders.clear();
        fx.store.save_user(&user).await.unwrap();

        assert_eq!(fx.coordinator.rebuild_mirror(fx.user.id).await.unwrap(), 1);
        let user = fx.store.find_user(fx.user.id).await.unwrap().unwrap();
        assert_eq!(user.orders[0].id, order.id);
        assert_eq!(user.orders[0].product_name, "Phone");
    }

    #[tokio::test]
    async fn test_held_order_only_completes() {
        let fx = fixture(5).await;
        let order = fx.place_order(2).await;
        // Stock already taken by a delivery whose order write failed.
        let mut product = fx.product.clone();
        product.quantity = 3;
        product.sold = 2;
        fx.store.save_product(&product).await.unwrap();
        let reconciliation_id = Uuid::new_v4();
        fx.coordinator.held().insert(order.id, reconciliation_id);

        let err = fx.coordinator.deliver(order.id).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::AwaitingCompletion { reconciliation_id: id, .. } if id == reconciliation_id
        ));
        let err = fx.coordinator.cancel(order.id).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::AwaitingCompletion { .. }));

        let delivery = fx.coordinator.complete_delivery(order.id).await.unwrap();
        assert_eq!(delivery.order.status(), OrderStatus::Delivered);
        assert!(delivery.mirror_updated);
        assert_eq!((delivery.product.quantity, delivery.product.sold), (3, 2));
        let stored = fx.store.find_product(fx.product.id).await.unwrap().unwrap();
        assert_eq!(stored, product);

        let again = fx.coordinator.complete_delivery(order.id).await.unwrap();
        assert_eq!(again.order.delivered_at, delivery.order.delivered_at);
        let err = fx.coordinator.deliver(order.id).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_complete_cancelled_order_fails() {
        let fx = fixture(5).await;
        let order = fx.place_order(1).await;
        fx.coordinator.cancel(order.id).await.unwrap();

        let err = fx.coordinator.complete_delivery(order.id).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_delete_releases_hold() {
        let fx = fixture(5).await;
        let order = fx.place_order(1).await;
        fx.coordinator.held().insert(order.id, Uuid::new_v4());

        fx.coordinator.delete_order(order.id, fx.user.id).await.unwrap();
        assert!(fx.coordinator.held().is_empty());
    }
}
