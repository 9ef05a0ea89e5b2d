//! `PostgreSQL` implementation of [`Store`].
//!
//! Each entity is one row; nested data (images, specs, the user's order
//! mirror) is stored as JSONB so a save is a single-row write, like the
//! document store the engine was designed against.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use emporium_core::{OrderId, ProductId, UserId};

use super::{RepositoryError, Store};
use crate::models::{NewOrder, NewProduct, NewUser, Order, OrderSummary, Product, User};

// =============================================================================
// Internal Row Types
// =============================================================================

const PRODUCT_COLUMNS: &str =
    "id, category, name, price, tax_rate, quantity, sold, images, specs, created_at";

const ORDER_COLUMNS: &str =
    "id, user_id, product_id, quantity, created_at, paid_at, amount_paid, delivered_at, not_cancelled";

const USER_COLUMNS: &str = "id, name, email, is_admin, created_at, order_summaries";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    category: String,
    name: String,
    price: Decimal,
    tax_rate: Decimal,
    quantity: i64,
    sold: i64,
    images: Json<Vec<String>>,
    specs: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            category: row.category,
            name: row.name,
            price: row.price,
            tax_rate: row.tax_rate,
            quantity: to_count(row.quantity, "product.quantity")?,
            sold: to_count(row.sold, "product.sold")?,
            images: row.images.0,
            specs: row.specs,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    product_id: ProductId,
    quantity: i64,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    amount_paid: Option<Decimal>,
    delivered_at: Option<DateTime<Utc>>,
    not_cancelled: bool,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: to_count(row.quantity, "order.quantity")?,
            created_at: row.created_at,
            paid_at: row.paid_at,
            amount_paid: row.amount_paid,
            delivered_at: row.delivered_at,
            not_cancelled: row.not_cancelled,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
    order_summaries: Json<Vec<OrderSummary>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            admin: row.is_admin,
            created_at: row.created_at,
            orders: row.order_summaries.0,
        }
    }
}

fn to_count(value: i64, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{column} out of range: {value}")))
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    R: TryInto<T, Error = RepositoryError>,
{
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Map an update's affected row count to `NotFound` when nothing matched.
const fn expect_one_row(rows_affected: u64) -> Result<(), RepositoryError> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// Store backed by the `shop` schema.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO shop.product (category, name, price, tax_rate, quantity, sold, images, specs)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&product.category)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.tax_rate)
        .bind(i64::from(product.quantity))
        .bind(Json(&product.images))
        .bind(&product.specs)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn save_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET category = $2, name = $3, price = $4, tax_rate = $5,
                quantity = $6, sold = $7, images = $8, specs = $9
            WHERE id = $1
            ",
        )
        .bind(product.id)
        .bind(&product.category)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.tax_rate)
        .bind(i64::from(product.quantity))
        .bind(i64::from(product.sold))
        .bind(Json(&product.images))
        .bind(&product.specs)
        .execute(&self.pool)
        .await?;

        expect_one_row(result.rows_affected())
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "DELETE FROM shop.product WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.customer_order (user_id, product_id, quantity, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(order.product_id)
        .bind(i64::from(order.quantity))
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn save_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.customer_order
            SET paid_at = $2, amount_paid = $3, delivered_at = $4, not_cancelled = $5
            WHERE id = $1
            ",
        )
        .bind(order.id)
        .bind(order.paid_at)
        .bind(order.amount_paid)
        .bind(order.delivered_at)
        .bind(order.not_cancelled)
        .execute(&self.pool)
        .await?;

        expect_one_row(result.rows_affected())
    }

    async fn delete_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "DELETE FROM shop.customer_order WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.customer_order ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.customer_order WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM shop.app_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO shop.app_user (name, email, is_admin)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("email already registered: {}", user.email))
            }
            other => RepositoryError::Database(other),
        })?;

        Ok(row.into())
    }

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.app_user
            SET name = $2, email = $3, is_admin = $4, order_summaries = $5
            WHERE id = $1
            ",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.admin)
        .bind(Json(&user.orders))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("email already registered: {}", user.email))
            }
            other => RepositoryError::Database(other),
        })?;

        expect_one_row(result.rows_affected())
    }

    async fn delete_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "DELETE FROM shop.app_user WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM shop.app_user ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_customers(&self) -> Result<usize, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.app_user WHERE NOT is_admin")
                .fetch_one(&self.pool)
                .await?;

        usize::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count: {count}")))
    }
}
