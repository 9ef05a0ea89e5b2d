//! Core types for Emporium.

pub mod id;
pub mod status;

pub use id::*;
pub use status::*;
