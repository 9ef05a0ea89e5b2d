//! [`PgStore`] against a real database.
//!
//! These tests require:
//! - A running `PostgreSQL` database reachable via `DATABASE_URL`
//! - A database that may be freely written to (tests create their own rows)
//!
//! Run with: cargo test -p emporium-integration-tests -- --include-ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sqlx::PgPool;

use emporium_admin::db::{PgStore, RepositoryError, Store};
use emporium_admin::models::NewUser;
use emporium_admin::services::{FulfillmentCoordinator, FulfillmentError};
use emporium_core::OrderStatus;
use emporium_integration_tests::{place_order, seed_product, seed_user};

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.expect("Failed to connect");
    sqlx::migrate!("../admin/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    PgStore::new(pool)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL via DATABASE_URL"]
async fn test_deliver_roundtrip() {
    let store = store().await;
    let user = seed_user(&store, &unique("Ada")).await.unwrap();
    let product = seed_product(&store, 5).await.unwrap();
    let order = place_order(&store, user.id, product.id, 3).await.unwrap();

    let coordinator = FulfillmentCoordinator::new(store.clone());
    coordinator.deliver(order.id).await.unwrap();

    let product = store.find_product(product.id).await.unwrap().unwrap();
    assert_eq!((product.quantity, product.sold), (2, 3));
    let order = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Delivered);
    let user = store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.orders.len(), 1);
    assert!(user.orders[0].delivered_at.is_some());

    let err = coordinator.cancel(order.id).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL via DATABASE_URL"]
async fn test_delete_returns_removed_order() {
    let store = store().await;
    let user = seed_user(&store, &unique("Grace")).await.unwrap();
    let product = seed_product(&store, 5).await.unwrap();
    let order = place_order(&store, user.id, product.id, 1).await.unwrap();

    let coordinator = FulfillmentCoordinator::new(store.clone());
    let deletion = coordinator.delete_order(order.id, user.id).await.unwrap();
    assert_eq!(deletion.order.id, order.id);
    assert!(deletion.mirror_entry_removed);
    assert!(store.find_order(order.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL via DATABASE_URL"]
async fn test_duplicate_email_conflicts() {
    let store = store().await;
    let email = format!("{}@example.com", unique("dup"));
    let new_user = || NewUser {
        name: "Dup".to_string(),
        email: email.clone(),
        admin: false,
    };
    store.insert_user(new_user()).await.unwrap();
    let err = store.insert_user(new_user()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}
