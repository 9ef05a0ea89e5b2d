//! Catalog product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::ProductId;

/// Maximum number of images a product carries (primary plus three extras).
pub const MAX_PRODUCT_IMAGES: usize = 4;

/// A catalog product.
///
/// `quantity` and `sold` are only changed by the inventory ledger during
/// fulfillment, or by an explicit catalog edit (restock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Catalog category slug.
    pub category: String,
    /// Display name.
    pub name: String,
    /// Unit price before tax.
    pub price: Decimal,
    /// Tax rate as a fraction (`0.18` for 18%).
    pub tax_rate: Decimal,
    /// Units on hand.
    pub quantity: u32,
    /// Units delivered to customers over the product's lifetime.
    pub sold: u32,
    /// Image references, primary image first.
    pub images: Vec<String>,
    /// Free-form specification attributes.
    pub specs: serde_json::Value,
    /// When the product was added to the catalog.
    pub created_at: DateTime<Utc>,
}

/// Fields for a product that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub category: String,
    pub name: String,
    pub price: Decimal,
    pub tax_rate: Decimal,
    pub quantity: u32,
    pub images: Vec<String>,
    pub specs: serde_json::Value,
}
