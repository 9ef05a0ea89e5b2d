//! Catalog maintenance: create, edit and delete products.
//!
//! New products are pushed to the search index in the background; see
//! [`super::search`]. Edits and deletes take the same per-product lock as
//! delivery, so a restock never overwrites a stock change in flight.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use emporium_core::ProductId;

use super::locks::KeyedLocks;
use super::search::{SearchIndex, SearchIndexBridge};
use crate::db::{RepositoryError, Store};
use crate::models::{MAX_PRODUCT_IMAGES, NewProduct, Product};

/// Category value the product form submits when nothing was picked.
const NO_CATEGORY: &str = "none";

/// Digits after the point that storage keeps for prices and tax rates.
const PRICE_SCALE: u32 = 2;
const TAX_RATE_SCALE: u32 = 4;

/// Largest integer parts storage holds for prices and tax rates.
const PRICE_MAX_WHOLE: i64 = 9_999_999_999;
const TAX_RATE_MAX_WHOLE: i64 = 99;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid product: {0}")]
    Validation(String),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Product fields submitted by the add and edit forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub category: String,
    pub name: String,
    pub price: Decimal,
    #[serde(alias = "tax")]
    pub tax_rate: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "empty_specs")]
    pub specs: serde_json::Value,
}

fn empty_specs() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl ProductInput {
    /// Check the input and normalize it into storable fields.
    ///
    /// Blank image slots are dropped, so a form with unused image fields is
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` describing the first bad field.
    pub fn validate(self) -> Result<NewProduct, CatalogError> {
        let invalid = |msg: &str| Err(CatalogError::Validation(msg.to_string()));

        let category = self.category.trim().to_string();
        if category.is_empty() || category == NO_CATEGORY {
            return invalid("a category must be selected");
        }
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return invalid("name must not be empty");
        }
        if self.price.is_sign_negative() {
            return invalid("price must not be negative");
        }
        if self.price.normalize().scale() > PRICE_SCALE
            || self.price.trunc() > Decimal::from(PRICE_MAX_WHOLE)
        {
            return invalid("price must have at most 2 decimal places and be below 10000000000");
        }
        if self.tax_rate.is_sign_negative() {
            return invalid("tax rate must not be negative");
        }
        if self.tax_rate.normalize().scale() > TAX_RATE_SCALE
            || self.tax_rate.trunc() > Decimal::from(TAX_RATE_MAX_WHOLE)
        {
            return invalid("tax rate must have at most 4 decimal places and be below 100");
        }
        let Ok(quantity) = u32::try_from(self.quantity) else {
            return invalid("quantity must be between 0 and 4294967295");
        };

        let images: Vec<String> = self
            .images
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        if images.len() > MAX_PRODUCT_IMAGES {
            return Err(CatalogError::Validation(format!(
                "at most {MAX_PRODUCT_IMAGES} images are allowed, got {}",
                images.len()
            )));
        }

        Ok(NewProduct {
            category,
            name,
            price: self.price,
            tax_rate: self.tax_rate,
            quantity,
            images,
            specs: self.specs,
        })
    }
}

/// Catalog operations over a store, with search indexing for new products.
pub struct CatalogService<S, I> {
    store: S,
    search: SearchIndexBridge<I>,
    product_locks: Arc<KeyedLocks<ProductId>>,
}

impl<S: Store, I: SearchIndex> CatalogService<S, I> {
    #[must_use]
    pub fn new(store: S, search: SearchIndexBridge<I>) -> Self {
        Self {
            store,
            search,
            product_locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Use `locks` for product edits, normally the fulfillment coordinator's.
    #[must_use]
    pub fn with_product_locks(mut self, locks: Arc<KeyedLocks<ProductId>>) -> Self {
        self.product_locks = locks;
        self
    }

    /// Store a new product and queue it for indexing.
    ///
    /// The product is returned as soon as it is stored; indexing failures
    /// never reach the caller.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for bad input or `Storage` if the insert fails.
    #[instrument(skip_all, fields(category = %input.category))]
    pub async fn create_product(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let new_product = input.validate()?;
        let product = self.store.insert_product(new_product).await?;

        // Detached: the primary write stands regardless of the index.
        drop(self.search.index_product(&product));

        info!(product_id = %product.id, name = %product.name, "Product added");
        Ok(product)
    }

    /// Replace a product's editable fields. Sold count and creation time are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `NotFound` or `Storage`.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<Product, CatalogError> {
        let fields = input.validate()?;
        let _guard = self.product_locks.lock(&id).await;
        let existing = self
            .store
            .find_product(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        let product = Product {
            category: fields.category,
            name: fields.name,
            price: fields.price,
            tax_rate: fields.tax_rate,
            quantity: fields.quantity,
            images: fields.images,
            specs: fields.specs,
            ..existing
        };
        self.store.save_product(&product).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::NotFound(id),
            other => CatalogError::Storage(other),
        })?;

        info!("Product updated");
        Ok(product)
    }

    /// Delete a product and return what was removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Storage`.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let _guard = self.product_locks.lock(&id).await;
        let product = self
            .store
            .delete_product(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        info!(name = %product.name, "Product deleted");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `NotFound` or `Storage`.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .find_product(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// All products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend errors.
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_products().await?)
    }

    /// Push every product to the search index and wait for the result.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the products cannot be listed.
    pub async fn reindex_all(&self) -> Result<super::search::ReindexReport, CatalogError> {
        let products = self.store.list_products().await?;
        Ok(self.search.reindex_all(&products).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::search::SearchBackend;

    fn input() -> ProductInput {
        ProductInput {
            category: "laptops".to_string(),
            name: "Ultrabook".to_string(),
            price: Decimal::new(99_900, 2),
            tax_rate: Decimal::new(18, 2),
            quantity: 5,
            images: vec!["a.jpg".to_string(), String::new(), " ".to_string()],
            specs: serde_json::json!({ "ram": "16GB" }),
        }
    }

    fn service() -> (MemoryStore, CatalogService<MemoryStore, SearchBackend>) {
        let store = MemoryStore::new();
        let service = CatalogService::new(store.clone(), SearchIndexBridge::new(SearchBackend::Disabled));
        (store, service)
    }

    #[test]
    fn test_validate_drops_blank_images() {
        let product = input().validate().unwrap();
        assert_eq!(product.images, vec!["a.jpg".to_string()]);
        assert_eq!(product.quantity, 5);
    }

    #[test]
    fn test_validate_rejects_placeholder_category() {
        let err = ProductInput {
            category: "none".to_string(),
            ..input()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        for bad in [
            ProductInput {
                price: Decimal::new(-1, 0),
                ..input()
            },
            ProductInput {
                tax_rate: Decimal::new(-5, 2),
                ..input()
            },
            ProductInput {
                quantity: -1,
                ..input()
            },
            ProductInput {
                name: "   ".to_string(),
                ..input()
            },
        ] {
            assert!(matches!(bad.validate(), Err(CatalogError::Validation(_))));
        }
    }

    #[test]
    fn test_validate_rejects_values_storage_would_round() {
        for bad in [
            ProductInput {
                price: Decimal::new(19_999, 3),
                ..input()
            },
            ProductInput {
                tax_rate: Decimal::new(18_125, 5),
                ..input()
            },
            ProductInput {
                price: Decimal::new(10_000_000_000, 0),
                ..input()
            },
            ProductInput {
                tax_rate: Decimal::ONE_HUNDRED,
                ..input()
            },
        ] {
            assert!(matches!(bad.validate(), Err(CatalogError::Validation(_))));
        }

        // Trailing zeros beyond the stored scale are harmless.
        let ok = ProductInput {
            price: Decimal::new(9_999_999_999_990, 3),
            tax_rate: Decimal::new(181_200, 6),
            ..input()
        }
        .validate()
        .unwrap();
        assert_eq!(ok.price, Decimal::new(999_999_999_999, 2));
        assert_eq!(ok.tax_rate, Decimal::new(1812, 4));
    }

    #[test]
    fn test_validate_rejects_too_many_images() {
        let err = ProductInput {
            images: (0..5).map(|i| format!("{i}.jpg")).collect(),
            ..input()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("at most 4 images"));
    }

    #[test]
    fn test_form_field_alias() {
        let parsed: ProductInput = serde_json::from_value(serde_json::json!({
            "category": "phones",
            "name": "Phone",
            "price": "199.99",
            "tax": "0.05",
            "quantity": 3
        }))
        .unwrap();
        assert_eq!(parsed.tax_rate, Decimal::new(5, 2));
        assert!(parsed.images.is_empty());
        assert!(parsed.specs.is_object());
    }

    #[tokio::test]
    async fn test_update_keeps_sold_count() {
        let (store, service) = service();
        let created = service.create_product(input()).await.unwrap();
        let mut sold = created.clone();
        sold.sold = 7;
        store.save_product(&sold).await.unwrap();

        let updated = service
            .update_product(
                created.id,
                ProductInput {
                    name: "Ultrabook 2".to_string(),
                    quantity: 20,
                    ..input()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ultrabook 2");
        assert_eq!(updated.quantity, 20);
        assert_eq!(updated.sold, 7);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_product() {
        let (_, service) = service();
        let missing = ProductId::new(404);
        assert!(matches!(
            service.update_product(missing, input()).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_product(missing).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_product() {
        let (store, service) = service();
        let created = service.create_product(input()).await.unwrap();
        let deleted = service.delete_product(created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(store.find_product(created.id).await.unwrap().is_none());
    }
}
