//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Store;
use crate::services::{
    AccountService, CatalogService, FulfillmentCoordinator, SearchBackend, SearchIndexBridge,
};

/// Application state shared across all handlers.
///
/// Generic over the store so route tests can run against
/// [`crate::db::MemoryStore`].
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    store: S,
    fulfillment: FulfillmentCoordinator<S>,
    catalog: CatalogService<S, SearchBackend>,
    accounts: AccountService<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store + Clone> AppState<S> {
    /// Build the state. The search backend is opened once here and shared by
    /// every request. Catalog and account edits lock through the
    /// coordinator's product and user locks.
    #[must_use]
    pub fn new(store: S, search: SearchBackend) -> Self {
        let fulfillment = FulfillmentCoordinator::new(store.clone());
        let catalog = CatalogService::new(store.clone(), SearchIndexBridge::new(search))
            .with_product_locks(fulfillment.product_locks());
        let accounts = AccountService::new(store.clone()).with_user_locks(fulfillment.user_locks());
        Self {
            inner: Arc::new(AppStateInner {
                store,
                fulfillment,
                catalog,
                accounts,
            }),
        }
    }
}

impl<S: Store> AppState<S> {
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    #[must_use]
    pub fn fulfillment(&self) -> &FulfillmentCoordinator<S> {
        &self.inner.fulfillment
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService<S, SearchBackend> {
        &self.inner.catalog
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService<S> {
        &self.inner.accounts
    }
}
