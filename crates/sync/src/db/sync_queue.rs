//! Database operations for the durable sync queue.
//!
//! Lifecycle per item: `queued -> processing -> {completed | queued(retry) |
//! failed}`. The `queued -> processing` transition is a single-row
//! compare-and-swap so two concurrent processors can never double-apply the
//! same mutation. `failed` is terminal and always paired with exactly one
//! dead-letter row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use slabworks_core::Sku;

use super::RepositoryError;

/// Status of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "queue_status", rename_all = "lowercase")]
pub enum QueueStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Platform operation class a queue item replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "queue_action", rename_all = "lowercase")]
pub enum QueueAction {
    Create,
    Update,
    Delete,
}

impl QueueAction {
    /// Stable lowercase name, matching the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A durable queue item.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueItem {
    /// Unique item ID.
    pub id: Uuid,
    /// SKU of the target item, when known.
    pub sku: Option<Sku>,
    /// Operation class.
    pub action: QueueAction,
    /// Operation payload (see `queue::QueuePayload`).
    pub payload: serde_json::Value,
    /// Current status.
    pub status: QueueStatus,
    /// Failed attempts so far.
    pub retry_count: i32,
    /// Retry budget.
    pub max_retries: i32,
    /// Earliest next attempt, when backing off.
    pub retry_after: Option<DateTime<Utc>>,
    /// Last failure message.
    pub error_message: Option<String>,
    /// Last failure category.
    pub error_category: Option<String>,
    /// When the item was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the item was last touched.
    pub updated_at: DateTime<Utc>,
}

/// Parameters for enqueueing an item.
#[derive(Debug)]
pub struct NewQueueItem {
    /// SKU of the target item, when known.
    pub sku: Option<Sku>,
    /// Operation class.
    pub action: QueueAction,
    /// Operation payload.
    pub payload: serde_json::Value,
    /// Retry budget.
    pub max_retries: i32,
}

const QUEUE_COLUMNS: &str = "id, sku, action, payload, status, retry_count, max_retries, \
     retry_after, error_message, error_category, created_at, updated_at";

/// Enqueue a new item.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn enqueue(pool: &PgPool, item: NewQueueItem) -> Result<QueueItem, RepositoryError> {
    let row = sqlx::query_as::<_, QueueItem>(&format!(
        r"
        INSERT INTO sync_queue (sku, action, payload, max_retries)
        VALUES ($1, $2, $3, $4)
        RETURNING {QUEUE_COLUMNS}
        "
    ))
    .bind(item.sku)
    .bind(item.action)
    .bind(item.payload)
    .bind(item.max_retries)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a batch of due queued items.
///
/// Items whose `retry_after` has not elapsed are skipped. Items with fewer
/// prior retries are preferred, oldest first within the same retry count.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn fetch_due(pool: &PgPool, limit: i64) -> Result<Vec<QueueItem>, RepositoryError> {
    let items = sqlx::query_as::<_, QueueItem>(&format!(
        r"
        SELECT {QUEUE_COLUMNS}
        FROM sync_queue
        WHERE status = 'queued' AND (retry_after IS NULL OR retry_after <= NOW())
        ORDER BY retry_count ASC, created_at ASC
        LIMIT $1
        "
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

/// Claim a queued item for processing.
///
/// Single-row compare-and-swap: succeeds only if the item is still
/// `queued`. Returns `false` when another processor won the claim.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn claim(pool: &PgPool, id: Uuid) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE sync_queue
        SET status = 'processing', updated_at = NOW()
        WHERE id = $1 AND status = 'queued'
        ",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark an item completed, clearing any previous error.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn mark_completed(pool: &PgPool, id: Uuid) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE sync_queue
        SET status = 'completed', error_message = NULL, error_category = NULL,
            retry_after = NULL, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Re-queue an item after a transient failure.
///
/// Increments `retry_count` and records the failure and the earliest next
/// attempt.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn requeue(
    pool: &PgPool,
    id: Uuid,
    error_message: &str,
    error_category: &str,
    retry_after: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE sync_queue
        SET status = 'queued', retry_count = retry_count + 1, retry_after = $2,
            error_message = $3, error_category = $4, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(retry_after)
    .bind(error_message)
    .bind(error_category)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark an item permanently failed.
///
/// The caller must create the paired dead-letter row.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    error_message: &str,
    error_category: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE sync_queue
        SET status = 'failed', error_message = $2, error_category = $3, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(error_message)
    .bind(error_category)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a queue item by ID.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<QueueItem>, RepositoryError> {
    let item = sqlx::query_as::<_, QueueItem>(&format!(
        r"
        SELECT {QUEUE_COLUMNS}
        FROM sync_queue
        WHERE id = $1
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(item)
}
