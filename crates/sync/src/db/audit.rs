//! Append-only audit log of inventory write attempts.
//!
//! Every write attempt - successful, rejected, or failed - produces exactly
//! one row here, keyed by the per-attempt request ID. This module only
//! inserts; audit rows are never updated or deleted by the sync engine.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// A new audit entry to append.
#[derive(Debug)]
pub struct NewAuditEntry<'a> {
    /// Action label (operation kind, or a composite like `location_transfer`).
    pub action: &'a str,
    /// State snapshot before the write.
    pub old_value: Option<serde_json::Value>,
    /// State snapshot after the write (or the rejected target).
    pub new_value: Option<serde_json::Value>,
    /// Human or system actor that triggered the write.
    pub actor: &'a str,
    /// Location the write targeted, when it targets a single location.
    pub location_id: Option<i64>,
    /// Per-attempt correlation ID.
    pub request_id: Uuid,
}

/// A persisted audit entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditEntry {
    /// Row ID.
    pub id: Uuid,
    /// Action label.
    pub action: String,
    /// State snapshot before the write.
    pub old_value: Option<serde_json::Value>,
    /// State snapshot after the write.
    pub new_value: Option<serde_json::Value>,
    /// Actor that triggered the write.
    pub actor: String,
    /// Location the write targeted.
    pub location_id: Option<i64>,
    /// Per-attempt correlation ID.
    pub request_id: Uuid,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

/// Append an audit entry.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn append(pool: &PgPool, entry: NewAuditEntry<'_>) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO inventory_audit (action, old_value, new_value, actor, location_id, request_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(entry.action)
    .bind(entry.old_value)
    .bind(entry.new_value)
    .bind(entry.actor)
    .bind(entry.location_id)
    .bind(entry.request_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch the audit trail for a correlation ID, oldest first.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn for_request(
    pool: &PgPool,
    request_id: Uuid,
) -> Result<Vec<AuditEntry>, RepositoryError> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        r"
        SELECT id, action, old_value, new_value, actor, location_id, request_id, created_at
        FROM inventory_audit
        WHERE request_id = $1
        ORDER BY created_at ASC
        ",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
