//! Account management.
//!
//! Customers register on the storefront; this exists to bootstrap the first
//! admin and for local setups.

use emporium_admin::db::Store;
use emporium_admin::services::UserInput;

use super::{CommandError, connect};

/// Create an account and return its id.
///
/// # Errors
///
/// Returns `Account` for a malformed name or email and `Repository` if the
/// email is already registered.
pub async fn create(email: &str, name: &str, admin: bool) -> Result<i64, CommandError> {
    let new_user = UserInput {
        name: name.to_owned(),
        email: email.to_owned(),
        admin,
    }
    .validate()?;

    let (_config, store) = connect().await?;

    tracing::info!("Creating user: {} (admin: {})", new_user.email, admin);
    let user = store.insert_user(new_user).await?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(user.id.get())
}
