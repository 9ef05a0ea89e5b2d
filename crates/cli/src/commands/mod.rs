//! Subcommand implementations.
//!
//! Every command except `migrate` goes through the same services as the
//! admin server, so locking and partial-failure reporting behave the same.

pub mod dashboard;
pub mod migrate;
pub mod mirror;
pub mod order;
pub mod search;
pub mod user;

use emporium_admin::config::{AdminConfig, ConfigError};
use emporium_admin::db::{self, PgStore, RepositoryError};
use emporium_admin::services::{AccountError, CatalogError, FulfillmentError, SearchIndexError};
use thiserror::Error;

/// Errors shared by the maintenance commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("Search index error: {0}")]
    Search(#[from] SearchIndexError),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load configuration and open a store on the admin database.
async fn connect() -> Result<(AdminConfig, PgStore), CommandError> {
    let config = AdminConfig::from_env()?;

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok((config, PgStore::new(pool)))
}
