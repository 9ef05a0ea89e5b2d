//! Business logic services for the back office.
//!
//! # Services
//!
//! - `fulfillment` - Deliver, cancel and delete orders across orders, users and products
//! - `lifecycle` - Order state machine
//! - `inventory` - Stock counters and income derivation
//! - `mirror` - The order summaries embedded in user records
//! - `search` - Best-effort search index writes and reindexing
//! - `reporting` - Dashboard metrics
//! - `catalog` - Product create, edit and delete
//! - `accounts` - User edit and delete
//! - `locks` - Per-key async locks shared by fulfillment, catalog and accounts

pub mod accounts;
pub mod catalog;
pub mod fulfillment;
pub mod inventory;
pub mod lifecycle;
pub mod locks;
pub mod mirror;
pub mod reporting;
pub mod search;

pub use accounts::{AccountError, AccountService, UserInput};
pub use catalog::{CatalogError, CatalogService, ProductInput};
pub use fulfillment::{
    Deletion, Delivery, Entity, FulfillmentCoordinator, FulfillmentError, Operation, Step,
};
pub use inventory::{InsufficientStock, derive_income, reserve_for_delivery};
pub use lifecycle::{InvalidTransition, Transition};
pub use reporting::{DashboardMetrics, compute_dashboard_metrics};
pub use search::{
    HttpSearchIndex, ReindexReport, SearchBackend, SearchDocument, SearchIndex,
    SearchIndexBridge, SearchIndexError,
};
