//! Local mirror of platform inventory levels.
//!
//! Read performance only. Whichever process last computed a result upserts
//! it; no lock is taken and Shopify remains the sole authority. The cache
//! healer periodically re-reads the stalest rows against the platform.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::RepositoryError;

/// A cached inventory level.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CachedLevel {
    /// Logical store the level belongs to.
    pub store_key: String,
    /// Inventory item.
    pub inventory_item_id: i64,
    /// Location.
    pub location_id: i64,
    /// Last known available quantity.
    pub available: i64,
    /// When the mirror was last written.
    pub updated_at: DateTime<Utc>,
}

/// Upsert a cached level with the latest computed value.
///
/// # Errors
///
/// Returns error if the database upsert fails.
pub async fn upsert_level(
    pool: &PgPool,
    store_key: &str,
    inventory_item_id: i64,
    location_id: i64,
    available: i64,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO inventory_levels_cache (store_key, inventory_item_id, location_id, available, updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (store_key, inventory_item_id, location_id)
        DO UPDATE SET available = EXCLUDED.available, updated_at = NOW()
        ",
    )
    .bind(store_key)
    .bind(inventory_item_id)
    .bind(location_id)
    .bind(available)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a cached level, if mirrored.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get_level(
    pool: &PgPool,
    store_key: &str,
    inventory_item_id: i64,
    location_id: i64,
) -> Result<Option<CachedLevel>, RepositoryError> {
    let level = sqlx::query_as::<_, CachedLevel>(
        r"
        SELECT store_key, inventory_item_id, location_id, available, updated_at
        FROM inventory_levels_cache
        WHERE store_key = $1 AND inventory_item_id = $2 AND location_id = $3
        ",
    )
    .bind(store_key)
    .bind(inventory_item_id)
    .bind(location_id)
    .fetch_optional(pool)
    .await?;

    Ok(level)
}

/// Fetch the least recently refreshed cache rows for a store.
///
/// Used by the cache healer to pick which rows to re-read from the platform.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn stalest(
    pool: &PgPool,
    store_key: &str,
    limit: i64,
) -> Result<Vec<CachedLevel>, RepositoryError> {
    let levels = sqlx::query_as::<_, CachedLevel>(
        r"
        SELECT store_key, inventory_item_id, location_id, available, updated_at
        FROM inventory_levels_cache
        WHERE store_key = $1
        ORDER BY updated_at ASC
        LIMIT $2
        ",
    )
    .bind(store_key)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(levels)
}
