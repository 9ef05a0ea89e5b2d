//! Session-stored identity written by the storefront login flow.

use serde::{Deserialize, Serialize};

use emporium_core::UserId;

/// The logged-in account as recorded in the shared session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    /// Admin console access.
    pub admin: bool,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
