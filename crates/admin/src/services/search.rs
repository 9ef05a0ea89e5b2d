//! Search index bridge.
//!
//! Products are mirrored into a remote full-text index for the storefront's
//! search box. The primary store is the source of truth: index writes are
//! best-effort, run off the request path, and their failures are only logged.
//! Entries missed that way are restored by the `emporium-cli search reindex`
//! sweep.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::SearchIndexConfig;
use crate::models::Product;

/// Header carrying the index API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Errors that can occur when talking to the search index.
#[derive(Debug, Error)]
pub enum SearchIndexError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Index rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Unauthorized (invalid API key).
    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    /// Client could not be configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Document stored in the index for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub object_id: String,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub in_stock: bool,
    pub specs: serde_json::Value,
}

impl From<&Product> for SearchDocument {
    fn from(product: &Product) -> Self {
        Self {
            object_id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            image: product.images.first().cloned(),
            in_stock: product.quantity > 0,
            specs: product.specs.clone(),
        }
    }
}

/// A full-text index that accepts document upserts.
pub trait SearchIndex: Send + Sync + 'static {
    /// Insert or replace the document with `document.object_id`.
    fn upsert(
        &self,
        document: SearchDocument,
    ) -> impl Future<Output = Result<(), SearchIndexError>> + Send;
}

// =============================================================================
// HTTP client
// =============================================================================

/// Client for the hosted search index REST API.
#[derive(Clone)]
pub struct HttpSearchIndex {
    inner: Arc<HttpSearchIndexInner>,
}

struct HttpSearchIndexInner {
    client: reqwest::Client,
    base_url: String,
    index_name: String,
}

impl HttpSearchIndex {
    /// Create a client for the configured index.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SearchIndexConfig) -> Result<Self, SearchIndexError> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| SearchIndexError::Config(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpSearchIndexInner {
                client,
                base_url: config.url.as_str().trim_end_matches('/').to_string(),
                index_name: config.index_name.clone(),
            }),
        })
    }

    fn document_url(&self, object_id: &str) -> String {
        format!(
            "{}/indexes/{}/documents/{object_id}",
            self.inner.base_url, self.inner.index_name
        )
    }
}

impl SearchIndex for HttpSearchIndex {
    async fn upsert(&self, document: SearchDocument) -> Result<(), SearchIndexError> {
        let url = self.document_url(&document.object_id);
        let response = self.inner.client.put(&url).json(&document).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(SearchIndexError::Unauthorized);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(SearchIndexError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for HttpSearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSearchIndex")
            .field("base_url", &self.inner.base_url)
            .field("index_name", &self.inner.index_name)
            .finish_non_exhaustive()
    }
}

/// The index used by the server: the hosted index, or nothing when
/// `SEARCH_INDEX_*` is not configured.
#[derive(Debug, Clone)]
pub enum SearchBackend {
    Http(HttpSearchIndex),
    Disabled,
}

impl SearchBackend {
    /// Build the backend from optional configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configured client cannot be built.
    pub fn from_config(config: Option<&SearchIndexConfig>) -> Result<Self, SearchIndexError> {
        config.map_or(Ok(Self::Disabled), |c| HttpSearchIndex::new(c).map(Self::Http))
    }
}

impl SearchIndex for SearchBackend {
    async fn upsert(&self, document: SearchDocument) -> Result<(), SearchIndexError> {
        match self {
            Self::Http(index) => index.upsert(document).await,
            Self::Disabled => {
                debug!(object_id = %document.object_id, "Search index disabled, skipping upsert");
                Ok(())
            }
        }
    }
}

// =============================================================================
// Bridge
// =============================================================================

/// Outcome of a full reindex sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub indexed: usize,
    pub failed: usize,
}

/// Hands product writes to the search index without blocking the caller.
pub struct SearchIndexBridge<I> {
    index: Arc<I>,
}

impl<I> Clone for SearchIndexBridge<I> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
        }
    }
}

impl<I: SearchIndex> SearchIndexBridge<I> {
    /// Wrap an index handle. The handle is opened once and reused.
    #[must_use]
    pub fn new(index: I) -> Self {
        Self {
            index: Arc::new(index),
        }
    }

    /// Upsert `product` in the background.
    ///
    /// Failures are logged and swallowed. The returned handle only exists so
    /// callers that care (tests, the CLI) can wait for completion.
    pub fn index_product(&self, product: &Product) -> JoinHandle<()> {
        let index = Arc::clone(&self.index);
        let document = SearchDocument::from(product);
        let product_id = product.id;

        tokio::spawn(async move {
            match index.upsert(document).await {
                Ok(()) => debug!(product_id = %product_id, "Product indexed"),
                Err(e) => warn!(
                    product_id = %product_id,
                    error = %e,
                    "Failed to index product, search results will miss it until the next reindex"
                ),
            }
        })
    }

    /// Upsert every product in turn and report how many made it.
    #[instrument(skip_all, fields(products = products.len()))]
    pub async fn reindex_all(&self, products: &[Product]) -> ReindexReport {
        let mut report = ReindexReport::default();
        for product in products {
            match self.index.upsert(SearchDocument::from(product)).await {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    warn!(product_id = %product.id, error = %e, "Reindex failed for product");
                    report.failed += 1;
                }
            }
        }
        info!(indexed = report.indexed, failed = report.failed, "Reindex finished");
        report
    }
}
