//! One-shot queue drain command.
//!
//! Builds the same stack as the worker binary and processes a single
//! batch. Useful for operators replaying backed-up items without waiting
//! for the worker's poll interval.

use slabworks_sync::config::SyncConfig;
use slabworks_sync::db;
use slabworks_sync::inventory::InventoryWriteGateway;
use slabworks_sync::listings::HttpListingClient;
use slabworks_sync::queue::QueueProcessor;
use slabworks_sync::shopify::ShopifyClient;

/// Process one sync queue batch and exit.
///
/// # Errors
///
/// Returns an error if configuration loading, the database connection, or
/// the queue tables fail. Per-item platform failures are handled by the
/// processor and do not fail the command.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = SyncConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    let shopify = ShopifyClient::new(&config.shopify, config.rate_limit);
    let listings = HttpListingClient::new(&config.listings);
    let gateway = InventoryWriteGateway::new(shopify.clone(), pool);
    let processor = QueueProcessor::new(gateway, shopify, listings, config.queue);

    let summary = processor.process_batch().await?;

    tracing::info!(
        processed = summary.processed,
        completed = summary.completed,
        requeued = summary.requeued,
        dead_lettered = summary.dead_lettered,
        claim_lost = summary.claim_lost,
        "Drain complete"
    );

    Ok(())
}
