//! Account maintenance: edit and delete users.
//!
//! Edits take the per-user lock shared with fulfillment, which rewrites the
//! same record when it updates the order mirror.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use emporium_core::UserId;

use super::locks::KeyedLocks;
use crate::db::{RepositoryError, Store};
use crate::models::{NewUser, User};

/// Errors from account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid user: {0}")]
    Validation(String),

    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(RepositoryError),
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Storage(other),
        }
    }
}

/// Account fields submitted by the edit form.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
}

impl UserInput {
    /// Trim the name and lowercase the email.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for an empty name or an address
    /// without `@` and a dot.
    pub fn validate(self) -> Result<NewUser, AccountError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AccountError::Validation("name must not be empty".to_string()));
        }
        let email = self.email.trim().to_lowercase();
        if !email.contains('@') || !email.contains('.') {
            return Err(AccountError::Validation(format!("invalid email: {email}")));
        }
        Ok(NewUser {
            name,
            email,
            admin: self.admin,
        })
    }
}

/// Account operations over a store.
pub struct AccountService<S> {
    store: S,
    user_locks: Arc<KeyedLocks<UserId>>,
}

impl<S: Store> AccountService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            user_locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Use `locks` for account edits, normally the fulfillment coordinator's.
    #[must_use]
    pub fn with_user_locks(mut self, locks: Arc<KeyedLocks<UserId>>) -> Self {
        self.user_locks = locks;
        self
    }

    /// Replace a user's name, email and admin flag. The order mirror and
    /// creation time are kept.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `NotFound`, `Conflict` if the email belongs to
    /// another account, or `Storage`.
    #[instrument(skip(self, input), fields(user_id = %id))]
    pub async fn update_user(&self, id: UserId, input: UserInput) -> Result<User, AccountError> {
        let fields = input.validate()?;
        let _guard = self.user_locks.lock(&id).await;
        let existing = self
            .store
            .find_user(id)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let user = User {
            name: fields.name,
            email: fields.email,
            admin: fields.admin,
            ..existing
        };
        self.store.save_user(&user).await.map_err(|e| match e {
            RepositoryError::NotFound => AccountError::NotFound(id),
            other => other.into(),
        })?;

        info!(admin = user.admin, "User updated");
        Ok(user)
    }

    /// Delete a user and return what was removed. Their orders stay, so
    /// sales history and the dashboard are unchanged.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Storage`.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: UserId) -> Result<User, AccountError> {
        let _guard = self.user_locks.lock(&id).await;
        let user = self
            .store
            .delete_user(id)
            .await?
            .ok_or(AccountError::NotFound(id))?;
        info!(orders = user.orders.len(), "User deleted");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `NotFound` or `Storage`.
    pub async fn get_user(&self, id: UserId) -> Result<User, AccountError> {
        self.store
            .find_user(id)
            .await?
            .ok_or(AccountError::NotFound(id))
    }

    /// All users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend errors.
    pub async fn list_users(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.store.list_users().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::OrderSummary;
    use chrono::Utc;
    use emporium_core::{OrderId, ProductId};

    async fn seeded() -> (MemoryStore, AccountService<MemoryStore>, User) {
        let store = MemoryStore::new();
        let mut user = store
            .insert_user(NewUser {
                name: "Noor".to_string(),
                email: "noor@example.com".to_string(),
                admin: false,
            })
            .await
            .unwrap();
        user.orders.push(OrderSummary {
            id: OrderId::new(90),
            product_id: ProductId::new(91),
            product_name: "Lamp".to_string(),
            quantity: 1,
            ordered_at: Utc::now(),
            delivered_at: None,
        });
        store.save_user(&user).await.unwrap();
        (store.clone(), AccountService::new(store), user)
    }

    fn input(email: &str) -> UserInput {
        UserInput {
            name: "  Noor A. ".to_string(),
            email: email.to_string(),
            admin: true,
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let user = input(" Noor@Example.COM ").validate().unwrap();
        assert_eq!(user.name, "Noor A.");
        assert_eq!(user.email, "noor@example.com");
        assert!(user.admin);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert!(matches!(
            input("nowhere").validate(),
            Err(AccountError::Validation(_))
        ));
        let blank = UserInput {
            name: " ".to_string(),
            ..input("noor@example.com")
        };
        assert!(matches!(blank.validate(), Err(AccountError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_mirror_and_creation_time() {
        let (store, service, user) = seeded().await;
        let updated = service
            .update_user(user.id, input("noor.a@example.com"))
            .await
            .unwrap();
        assert_eq!(updated.email, "noor.a@example.com");
        assert!(updated.admin);
        assert_eq!(updated.orders, user.orders);
        assert_eq!(updated.created_at, user.created_at);
        assert_eq!(store.find_user(user.id).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_to_taken_email_conflicts() {
        let (store, service, user) = seeded().await;
        store
            .insert_user(NewUser {
                name: "Other".to_string(),
                email: "other@example.com".to_string(),
                admin: false,
            })
            .await
            .unwrap();
        let err = service
            .update_user(user.id, input("other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_user_then_missing() {
        let (store, service, user) = seeded().await;
        let deleted = service.delete_user(user.id).await.unwrap();
        assert_eq!(deleted.id, user.id);
        assert!(store.find_user(user.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete_user(user.id).await,
            Err(AccountError::NotFound(_))
        ));
        assert!(matches!(
            service.update_user(user.id, input("noor@example.com")).await,
            Err(AccountError::NotFound(_))
        ));
    }
}
