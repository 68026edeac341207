//! Single entry point for all inventory mutations.

use std::time::Instant;

use serde_json::json;
use sqlx::PgPool;
use tracing::{error, instrument};

use crate::db::{audit, inventory_cache};

use super::{
    GuardOutcome, InventoryApi, OptimisticLockGuard, WriteRequest, WriteResult,
};

/// The write gateway.
///
/// Classifies each request as delta or absolute, validates its constraints,
/// runs the optimistic-lock sequence, and always appends one audit entry -
/// for successes, stale rejections, validation failures, everything. The
/// cache mirror is upserted on success.
///
/// `write` never returns `Err` for expected failure modes; every outcome is
/// represented in the [`WriteResult`].
#[derive(Clone)]
pub struct InventoryWriteGateway<A: InventoryApi> {
    api: A,
    pool: PgPool,
}

impl<A: InventoryApi> InventoryWriteGateway<A> {
    /// Create a gateway over a platform API and the local database.
    #[must_use]
    pub const fn new(api: A, pool: PgPool) -> Self {
        Self { api, pool }
    }

    /// The underlying platform API (for pre-read orchestration).
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// The local database pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Execute a single inventory mutation.
    #[instrument(
        skip(self, request),
        fields(
            request_id = %request.request_id,
            kind = %request.kind,
            item = %request.inventory_item_id,
            location = %request.location_id,
        )
    )]
    pub async fn write(&self, request: &WriteRequest) -> WriteResult {
        let started = Instant::now();
        let api_used = request.kind.api_class();

        // Validation precedes any network call. Rejections are still audited
        // so every call attempt is observable.
        if let Err(validation) = request.kind.validate(request.quantity) {
            let result = WriteResult {
                success: false,
                api_used,
                previous_available: None,
                new_available: None,
                error: Some(validation),
                stale: false,
                latency_ms: elapsed_ms(started),
                request_id: request.request_id,
            };
            self.record_audit(request, &result).await;
            return result;
        }

        // Delta kinds carry a signed magnitude; absolute kinds the target.
        let value = request
            .kind
            .signed_delta(request.quantity)
            .unwrap_or(request.quantity);

        let guard = OptimisticLockGuard::new(&self.api);
        let outcome = guard
            .apply(
                request.kind,
                request.inventory_item_id,
                request.location_id,
                value,
                request.expected_available,
            )
            .await;

        let result = Self::into_result(request, outcome, elapsed_ms(started));

        if result.success {
            self.update_cache(request, &result).await;
        }
        self.record_audit(request, &result).await;

        result
    }

    fn into_result(request: &WriteRequest, outcome: GuardOutcome, latency_ms: u64) -> WriteResult {
        WriteResult {
            success: outcome.success,
            api_used: request.kind.api_class(),
            previous_available: outcome.previous,
            new_available: outcome.new,
            error: outcome.error,
            stale: outcome.stale,
            latency_ms,
            request_id: request.request_id,
        }
    }

    /// Mirror the new level locally. Best-effort: the platform write already
    /// happened, so a cache failure is logged, not surfaced.
    async fn update_cache(&self, request: &WriteRequest, result: &WriteResult) {
        let Some(available) = result.new_available else {
            return;
        };

        if let Err(e) = inventory_cache::upsert_level(
            &self.pool,
            &request.store_key,
            request.inventory_item_id.as_i64(),
            request.location_id.as_i64(),
            available,
        )
        .await
        {
            error!(error = %e, request_id = %request.request_id, "Failed to update inventory cache mirror");
        }
    }

    /// Append the audit entry for this attempt. Best-effort: a lost audit
    /// row must not turn a completed platform write into a reported failure.
    async fn record_audit(&self, request: &WriteRequest, result: &WriteResult) {
        let actor = request
            .triggered_by
            .as_deref()
            .unwrap_or(request.source_function);

        let old_value = json!({
            "available": result.previous_available,
            "sku": request.sku,
        });
        let new_value = json!({
            "available": result.new_available,
            "requested_quantity": request.quantity,
            "expected_available": request.expected_available,
            "api_used": result.api_used,
            "success": result.success,
            "stale": result.stale,
            "error": result.error,
            "latency_ms": result.latency_ms,
            "source_function": request.source_function,
            "store_key": request.store_key,
        });

        let entry = audit::NewAuditEntry {
            action: request.kind.as_str(),
            old_value: Some(old_value),
            new_value: Some(new_value),
            actor,
            location_id: Some(request.location_id.as_i64()),
            request_id: request.request_id,
        };

        if let Err(e) = audit::append(&self.pool, entry).await {
            error!(error = %e, request_id = %request.request_id, "Failed to append audit entry");
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
