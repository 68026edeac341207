//! Periodic cache-mirror repair.
//!
//! Saga rollback and cache upserts are best-effort, so the mirror can
//! drift from the platform truth (a compensating write that failed, a
//! crashed worker between write and upsert). The healer sweeps the least
//! recently refreshed rows, re-reads each from the platform, and upserts
//! the authoritative value. It repairs the mirror only - it never mutates
//! platform quantities.

use tracing::{info, instrument, warn};

use slabworks_core::{InventoryItemId, LocationId};

use crate::db::{RepositoryError, inventory_cache};
use crate::shopify::ShopifyError;

use super::InventoryApi;

/// Re-reads stale cache rows against the platform.
pub struct CacheHealer<A: InventoryApi> {
    api: A,
    pool: sqlx::PgPool,
    batch_size: i64,
}

impl<A: InventoryApi> CacheHealer<A> {
    /// Create a healer.
    pub const fn new(api: A, pool: sqlx::PgPool, batch_size: i64) -> Self {
        Self {
            api,
            pool,
            batch_size,
        }
    }

    /// Run one healing pass for a store. Returns how many rows drifted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` when the cache table is unreachable.
    /// Per-row platform read failures are logged and skipped.
    #[instrument(skip(self))]
    pub async fn heal_once(&self, store_key: &str) -> Result<u32, RepositoryError> {
        let rows = inventory_cache::stalest(&self.pool, store_key, self.batch_size).await?;
        let mut drifted = 0u32;

        for row in rows {
            let item = InventoryItemId::new(row.inventory_item_id);
            let location = LocationId::new(row.location_id);

            let authoritative = match self.api.read_available(item, location).await {
                Ok(v) => v,
                Err(ShopifyError::NotFound(_)) => {
                    // Item no longer stocked at this location; mirror zero.
                    0
                }
                Err(e) => {
                    warn!(error = %e, item = %item, location = %location, "Healer read failed, skipping row");
                    continue;
                }
            };

            if authoritative != row.available {
                warn!(
                    item = %item,
                    location = %location,
                    cached = row.available,
                    authoritative,
                    "Cache mirror drifted from platform, repairing"
                );
                drifted += 1;
            }

            inventory_cache::upsert_level(
                &self.pool,
                store_key,
                row.inventory_item_id,
                row.location_id,
                authoritative,
            )
            .await?;
        }

        if drifted > 0 {
            info!(drifted, "Cache healing pass repaired drifted rows");
        }

        Ok(drifted)
    }
}
