//! Order mirror reconciliation.
//!
//! Used after a `PartialFailure` left a user's embedded order list out of
//! step with the order collection. Rebuilding is idempotent.
//!
//! The per-user lock taken here lives in this process only, so it does not
//! exclude a running admin server. A delivery landing mid-rebuild can have
//! its mirror update overwritten. Run this with the admin server stopped, or
//! use `POST /user/{id}/rebuild-orders` on the server instead.

use emporium_admin::db::Store;
use emporium_admin::services::FulfillmentCoordinator;
use emporium_core::UserId;

use super::{CommandError, connect};

/// Rebuild the mirror of `user`, or of every account when `None`.
///
/// # Errors
///
/// Stops at the first user that cannot be rebuilt.
pub async fn rebuild(user: Option<UserId>) -> Result<(), CommandError> {
    let (_config, store) = connect().await?;

    let user_ids = match user {
        Some(id) => vec![id],
        None => store.list_users().await?.into_iter().map(|u| u.id).collect(),
    };

    let coordinator = FulfillmentCoordinator::new(store);
    let mut entries = 0;
    for id in &user_ids {
        let count = coordinator.rebuild_mirror(*id).await?;
        tracing::info!(user_id = %id, entries = count, "Mirror rebuilt");
        entries += count;
    }

    tracing::info!(users = user_ids.len(), entries, "Mirror rebuild complete");
    Ok(())
}
