//! In-process [`Store`] backed by ordered maps.
//!
//! Used by the test suites and by local runs without `PostgreSQL`. Cloning a
//! `MemoryStore` yields another handle to the same data.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use emporium_core::{OrderId, ProductId, UserId};

use super::{RepositoryError, Store};
use crate::models::{NewOrder, NewProduct, NewUser, Order, Product, User};

/// Thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    users: BTreeMap<UserId, User>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        f(&tables)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

/// Overwrite `key` if present.
fn replace<K: Ord, V: Clone>(
    map: &mut BTreeMap<K, V>,
    key: &K,
    value: &V,
) -> Result<(), RepositoryError> {
    let slot = map.get_mut(key).ok_or(RepositoryError::NotFound)?;
    *slot = value.clone();
    Ok(())
}

impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.read(|t| t.products.get(&id).cloned()))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        Ok(self.write(|t| {
            let stored = Product {
                id: ProductId::new(t.next_id()),
                category: product.category,
                name: product.name,
                price: product.price,
                tax_rate: product.tax_rate,
                quantity: product.quantity,
                sold: 0,
                images: product.images,
                specs: product.specs,
                created_at: chrono::Utc::now(),
            };
            t.products.insert(stored.id, stored.clone());
            stored
        }))
    }

    async fn save_product(&self, product: &Product) -> Result<(), RepositoryError> {
        self.write(|t| replace(&mut t.products, &product.id, product))
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.write(|t| t.products.remove(&id)))
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.read(|t| t.products.values().cloned().collect()))
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.read(|t| t.orders.get(&id).cloned()))
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        Ok(self.write(|t| {
            let stored = Order {
                id: OrderId::new(t.next_id()),
                user_id: order.user_id,
                product_id: order.product_id,
                quantity: order.quantity,
                created_at: order.created_at,
                paid_at: None,
                amount_paid: None,
                delivered_at: None,
                not_cancelled: true,
            };
            t.orders.insert(stored.id, stored.clone());
            stored
        }))
    }

    async fn save_order(&self, order: &Order) -> Result<(), RepositoryError> {
        self.write(|t| replace(&mut t.orders, &order.id, order))
    }

    async fn delete_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.write(|t| t.orders.remove(&id)))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.read(|t| {
            let mut orders: Vec<Order> = t.orders.values().cloned().collect();
            orders.sort_by_key(|o| (o.created_at, o.id));
            orders
        }))
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.list_orders().await?;
        orders.retain(|o| o.user_id == user_id);
        Ok(orders)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.read(|t| t.users.get(&id).cloned()))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.write(|t| {
            if t.users.values().any(|u| u.email == user.email) {
                return Err(RepositoryError::Conflict(format!(
                    "email already registered: {}",
                    user.email
                )));
            }
            let stored = User {
                id: UserId::new(t.next_id()),
                name: user.name,
                email: user.email,
                admin: user.admin,
                created_at: chrono::Utc::now(),
                orders: Vec::new(),
            };
            t.users.insert(stored.id, stored.clone());
            Ok(stored)
        })
    }

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError> {
        self.write(|t| {
            if t
                .users
                .values()
                .any(|u| u.id != user.id && u.email == user.email)
            {
                return Err(RepositoryError::Conflict(format!(
                    "email already registered: {}",
                    user.email
                )));
            }
            replace(&mut t.users, &user.id, user)
        })
    }

    async fn delete_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.write(|t| t.users.remove(&id)))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.read(|t| t.users.values().cloned().collect()))
    }

    async fn count_customers(&self) -> Result<usize, RepositoryError> {
        Ok(self.read(|t| t.users.values().filter(|u| !u.admin).count()))
    }
}
