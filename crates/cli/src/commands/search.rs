//! Search index maintenance.

use emporium_admin::services::{CatalogService, HttpSearchIndex, SearchIndexBridge};

use super::{CommandError, connect};

/// Push every product to the configured search index.
///
/// Individual document failures are counted, not fatal.
///
/// # Errors
///
/// Returns an error if the index is not configured or the catalog cannot be
/// read.
pub async fn reindex() -> Result<(), CommandError> {
    let (config, store) = connect().await?;

    let index_config = config.search_index().ok_or_else(|| {
        CommandError::Invalid(
            "SEARCH_INDEX_URL, SEARCH_INDEX_NAME and SEARCH_INDEX_API_KEY must be set".to_string(),
        )
    })?;
    let index = HttpSearchIndex::new(index_config)?;

    let catalog = CatalogService::new(store, SearchIndexBridge::new(index));
    let report = catalog.reindex_all().await?;

    tracing::info!(
        indexed = report.indexed,
        failed = report.failed,
        "Search reindex complete"
    );
    if report.failed > 0 {
        tracing::warn!("Some products were not indexed; see errors above");
    }
    Ok(())
}
