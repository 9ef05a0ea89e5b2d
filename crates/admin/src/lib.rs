//! Emporium Admin library.
//!
//! The back office of the Emporium storefront: catalog maintenance, order
//! fulfillment and the dashboard. Provided as a library so the CLI and the
//! integration tests can drive the same engine as the server.
//!
//! # Consistency
//!
//! Orders, users (with their embedded order mirror) and products are stored
//! separately with no cross-record transactions. All lifecycle changes go
//! through [`services::FulfillmentCoordinator`], which serializes work per
//! order and reports partially applied operations with a reconciliation id.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
