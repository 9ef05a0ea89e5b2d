//! Emporium Core - shared types library.
//!
//! Types used by every Emporium component:
//! - `admin` - back-office server and the order fulfillment engine
//! - `cli` - migrations and reconciliation jobs
//!
//! The core crate holds only types. No I/O, no database access, no HTTP
//! clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and the derived order status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
