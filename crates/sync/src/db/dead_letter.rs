//! Dead-letter storage for permanently-failed queue items.
//!
//! Created exactly once per item that exhausts its retry budget (or fails
//! non-retryably), with a full snapshot of the item and its failure
//! context. Rows are never mutated after creation; they are the forensic
//! record for manual recovery.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;
use super::sync_queue::QueueItem;
use crate::inventory::WriteError;

/// A dead-letter entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeadLetterEntry {
    /// Row ID.
    pub id: Uuid,
    /// The failed queue item this entry was created from.
    pub queue_item_id: Uuid,
    /// Full snapshot of the queue item at failure time.
    pub item_snapshot: serde_json::Value,
    /// Failure context: error, category, retry count, timestamps.
    pub failure_context: serde_json::Value,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

/// Build the item snapshot recorded alongside a failure.
#[must_use]
pub fn item_snapshot(item: &QueueItem) -> serde_json::Value {
    serde_json::json!({
        "id": item.id,
        "sku": item.sku,
        "action": item.action.as_str(),
        "payload": item.payload,
        "retry_count": item.retry_count,
        "max_retries": item.max_retries,
        "created_at": item.created_at,
    })
}

/// Build the failure context recorded alongside a failure.
#[must_use]
pub fn failure_context(item: &QueueItem, error: &WriteError) -> serde_json::Value {
    serde_json::json!({
        "error": error.message,
        "category": error.category,
        "retry_count": item.retry_count,
        "first_enqueued_at": item.created_at,
        "failed_at": Utc::now(),
    })
}

/// Create the dead-letter entry for a permanently-failed queue item.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn create(
    pool: &PgPool,
    item: &QueueItem,
    error: &WriteError,
) -> Result<DeadLetterEntry, RepositoryError> {
    let entry = sqlx::query_as::<_, DeadLetterEntry>(
        r"
        INSERT INTO dead_letters (queue_item_id, item_snapshot, failure_context)
        VALUES ($1, $2, $3)
        RETURNING id, queue_item_id, item_snapshot, failure_context, created_at
        ",
    )
    .bind(item.id)
    .bind(item_snapshot(item))
    .bind(failure_context(item, error))
    .fetch_one(pool)
    .await?;

    Ok(entry)
}

/// List the most recent dead-letter entries.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn list_recent(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<DeadLetterEntry>, RepositoryError> {
    let entries = sqlx::query_as::<_, DeadLetterEntry>(
        r"
        SELECT id, queue_item_id, item_snapshot, failure_context, created_at
        FROM dead_letters
        ORDER BY created_at DESC
        LIMIT $1
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
