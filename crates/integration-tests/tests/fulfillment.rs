//! End-to-end fulfillment scenarios over the in-memory store.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;

use emporium_admin::db::{MemoryStore, Store};
use emporium_admin::services::{
    FulfillmentCoordinator, FulfillmentError, Step, compute_dashboard_metrics,
};
use emporium_core::{OrderId, OrderStatus, UserId};
use emporium_integration_tests::{place_order, seed_product, seed_user};

#[tokio::test]
async fn test_deliver_three_of_five() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "Ada").await.unwrap();
    let product = seed_product(&store, 5).await.unwrap();
    let order = place_order(&store, user.id, product.id, 3).await.unwrap();
    let coordinator = FulfillmentCoordinator::new(store.clone());

    let delivery = coordinator.deliver(order.id).await.unwrap();
    assert!(delivery.mirror_updated);

    let product = store.find_product(product.id).await.unwrap().unwrap();
    assert_eq!((product.quantity, product.sold), (2, 3));

    let order = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Delivered);
    assert_eq!(order.amount_paid, Some(Decimal::new(3540, 2)));
    assert_eq!(order.paid_at, order.delivered_at);

    let user = store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.orders[0].delivered_at, order.delivered_at);
}

#[tokio::test]
async fn test_overdraw_changes_nothing() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "Grace").await.unwrap();
    let product = seed_product(&store, 2).await.unwrap();
    let order = place_order(&store, user.id, product.id, 10).await.unwrap();
    let user_before = store.find_user(user.id).await.unwrap().unwrap();
    let coordinator = FulfillmentCoordinator::new(store.clone());

    let err = coordinator.deliver(order.id).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InsufficientStock(_)));

    assert_eq!(store.find_product(product.id).await.unwrap().unwrap(), product);
    assert_eq!(store.find_order(order.id).await.unwrap().unwrap(), order);
    assert_eq!(store.find_user(user.id).await.unwrap().unwrap(), user_before);
}

#[tokio::test]
async fn test_delete_with_missing_user_is_partial() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "Linus").await.unwrap();
    let product = seed_product(&store, 5).await.unwrap();
    let order = place_order(&store, user.id, product.id, 1).await.unwrap();
    let coordinator = FulfillmentCoordinator::new(store.clone());

    let err = coordinator
        .delete_order(order.id, UserId::new(9_999))
        .await
        .unwrap_err();
    match err {
        FulfillmentError::PartialFailure {
            completed,
            failed_step,
            order_id,
            ..
        } => {
            assert_eq!(order_id, order.id);
            assert_eq!(completed, vec![Step::DeleteOrder]);
            assert_eq!(failed_step, Step::LoadUser);
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }
    assert!(store.find_order(order.id).await.unwrap().is_none());

    // The real owner's mirror still lists the deleted order until rebuilt.
    let owner = store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(owner.orders.len(), 1);
    assert_eq!(coordinator.rebuild_mirror(user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_then_deliver() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "Barbara").await.unwrap();
    let product = seed_product(&store, 5).await.unwrap();
    let order = place_order(&store, user.id, product.id, 2).await.unwrap();
    let coordinator = FulfillmentCoordinator::new(store.clone());

    let cancelled = coordinator.cancel(order.id).await.unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(store.find_product(product.id).await.unwrap().unwrap(), product);

    let err = coordinator.deliver(order.id).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
    let err = coordinator.cancel(order.id).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_delivered_order_can_be_deleted() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "Edsger").await.unwrap();
    let product = seed_product(&store, 5).await.unwrap();
    let order = place_order(&store, user.id, product.id, 1).await.unwrap();
    let coordinator = FulfillmentCoordinator::new(store.clone());

    coordinator.deliver(order.id).await.unwrap();
    let deletion = coordinator.delete_order(order.id, user.id).await.unwrap();
    assert!(deletion.mirror_entry_removed);
    assert_eq!(deletion.order.status(), OrderStatus::Delivered);

    // Stock stays consumed; deleting is not a return.
    let product = store.find_product(product.id).await.unwrap().unwrap();
    assert_eq!((product.quantity, product.sold), (4, 1));
    assert!(store.find_user(user.id).await.unwrap().unwrap().orders.is_empty());
}

#[tokio::test]
async fn test_delivery_without_mirror_entry() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "Alan").await.unwrap();
    let product = seed_product(&store, 5).await.unwrap();
    let order = place_order(&store, user.id, product.id, 1).await.unwrap();

    let mut stripped = store.find_user(user.id).await.unwrap().unwrap();
    stripped.orders.clear();
    store.save_user(&stripped).await.unwrap();

    let coordinator = FulfillmentCoordinator::new(store.clone());
    let delivery = coordinator.deliver(order.id).await.unwrap();
    assert!(!delivery.mirror_updated);
    assert_eq!(delivery.order.status(), OrderStatus::Delivered);

    assert_eq!(coordinator.rebuild_mirror(user.id).await.unwrap(), 1);
    let user = store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.orders[0].id, order.id);
    assert!(user.orders[0].delivered_at.is_some());
}

#[tokio::test]
async fn test_unknown_order() {
    let coordinator = FulfillmentCoordinator::new(MemoryStore::new());
    let err = coordinator.deliver(OrderId::new(1)).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::NotFound { .. }));
    let err = coordinator
        .delete_order(OrderId::new(1), UserId::new(2))
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::NotFound { .. }));
}

#[tokio::test]
async fn test_dashboard_after_fulfillment() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "Margaret").await.unwrap();
    let product = seed_product(&store, 10).await.unwrap();
    let coordinator = FulfillmentCoordinator::new(store.clone());

    let mut orders = Vec::new();
    for quantity in [1, 2, 3, 4] {
        orders.push(place_order(&store, user.id, product.id, quantity).await.unwrap());
    }
    coordinator.deliver(orders[0].id).await.unwrap();
    coordinator.cancel(orders[1].id).await.unwrap();

    let products: HashMap<_, _> = store
        .list_products()
        .await
        .unwrap()
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let metrics = compute_dashboard_metrics(
        &store.list_orders().await.unwrap(),
        &products,
        store.count_customers().await.unwrap(),
        Utc::now(),
    );

    assert_eq!(metrics.delivery_rate_percent, 25);
    assert_eq!(metrics.pending_orders, 2);
    assert_eq!(metrics.monthly_income, Decimal::new(1180, 2));
    assert_eq!(metrics.yearly_income, Decimal::new(1180, 2));
    assert_eq!(metrics.total_customers, 1);
}
