//! Dashboard metrics from the command line.

use std::collections::HashMap;

use chrono::Utc;
use emporium_admin::db::Store;
use emporium_admin::services::compute_dashboard_metrics;

use super::{CommandError, connect};

/// Compute the dashboard snapshot and print it as JSON.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be read.
#[allow(clippy::print_stdout)]
pub async fn show() -> Result<(), CommandError> {
    let (_config, store) = connect().await?;

    let orders = store.list_orders().await?;
    let products: HashMap<_, _> = store
        .list_products()
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let customers = store.count_customers().await?;

    let metrics = compute_dashboard_metrics(&orders, &products, customers, Utc::now());
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
