//! Multi-item location transfer saga.
//!
//! Shopify's one-shot move API has no expected-value guard, so a transfer
//! is decomposed into two guarded writes per item: decrement the source
//! with `expected = source_before`, then increment the destination with
//! `expected = dest_before`. If the second step fails, a compensating
//! write restores the source. The compensation is best-effort - there is no
//! cross-step transaction - so a failed compensation is flagged loudly for
//! manual reconciliation and the cache healer.

use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use slabworks_core::{InventoryItemId, LocationId, Sku};

use crate::db::audit;

use super::{InventoryApi, InventoryWriteGateway, OperationKind, WriteError, WriteRequest};

/// A requested multi-item transfer between two locations.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Transfer ID (correlates all per-item writes).
    pub transfer_id: Uuid,
    /// Location stock leaves.
    pub source_location: LocationId,
    /// Location stock arrives at.
    pub destination_location: LocationId,
    /// Logical store the transfer belongs to.
    pub store_key: String,
    /// Staff member that initiated the transfer.
    pub triggered_by: Option<String>,
    /// Items to move.
    pub items: Vec<TransferItem>,
}

/// One line of a transfer.
#[derive(Debug, Clone)]
pub struct TransferItem {
    /// Inventory item to move.
    pub inventory_item_id: InventoryItemId,
    /// SKU, when known (for audit context).
    pub sku: Option<Sku>,
    /// Units to move. Must be positive.
    pub quantity: i64,
}

/// Per-item outcome of a transfer.
#[derive(Debug, Clone)]
pub struct TransferItemResult {
    /// Inventory item this result is for.
    pub inventory_item_id: InventoryItemId,
    /// SKU, when known.
    pub sku: Option<Sku>,
    /// Units requested.
    pub quantity: i64,
    /// Source quantity before the transfer.
    pub source_before: Option<i64>,
    /// Source quantity after the transfer (restored value on rollback).
    pub source_after: Option<i64>,
    /// Destination quantity before the transfer.
    pub destination_before: Option<i64>,
    /// Destination quantity after the transfer.
    pub destination_after: Option<i64>,
    /// Whether both legs applied.
    pub success: bool,
    /// Whether the source was restored after a destination failure.
    pub rolled_back: bool,
    /// Failure detail, when not successful.
    pub error: Option<WriteError>,
}

/// Overall transfer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Every item moved.
    Completed,
    /// Some items moved, some failed.
    Partial,
    /// No item moved.
    Failed,
}

/// Result of a whole transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Transfer ID copied from the request.
    pub transfer_id: Uuid,
    /// Rollup status.
    pub status: TransferStatus,
    /// Per-item results, in request order.
    pub items: Vec<TransferItemResult>,
}

/// Two-step saga over [`InventoryWriteGateway`] writes.
pub struct LocationTransferOrchestrator<A: InventoryApi> {
    gateway: InventoryWriteGateway<A>,
}

impl<A: InventoryApi> LocationTransferOrchestrator<A> {
    /// Create an orchestrator over a gateway.
    #[must_use]
    pub const fn new(gateway: InventoryWriteGateway<A>) -> Self {
        Self { gateway }
    }

    /// Execute a transfer.
    ///
    /// Items are processed independently: one item's failure does not block
    /// the rest. The rollup status is `Completed` when every item moved,
    /// `Partial` when some did, `Failed` when none did.
    #[instrument(
        skip(self, request),
        fields(
            transfer_id = %request.transfer_id,
            source = %request.source_location,
            destination = %request.destination_location,
            items = request.items.len(),
        )
    )]
    pub async fn execute(&self, request: &TransferRequest) -> TransferOutcome {
        let mut results = Vec::with_capacity(request.items.len());

        for item in &request.items {
            let result = self.transfer_item(request, item).await;
            if result.success {
                self.record_transfer_audit(request, &result).await;
            }
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let status = if succeeded == results.len() && !results.is_empty() {
            TransferStatus::Completed
        } else if succeeded > 0 {
            TransferStatus::Partial
        } else {
            TransferStatus::Failed
        };

        info!(
            transfer_id = %request.transfer_id,
            succeeded,
            total = results.len(),
            status = ?status,
            "Transfer finished"
        );

        TransferOutcome {
            transfer_id: request.transfer_id,
            status,
            items: results,
        }
    }

    async fn transfer_item(
        &self,
        request: &TransferRequest,
        item: &TransferItem,
    ) -> TransferItemResult {
        let mut result = TransferItemResult {
            inventory_item_id: item.inventory_item_id,
            sku: item.sku.clone(),
            quantity: item.quantity,
            source_before: None,
            source_after: None,
            destination_before: None,
            destination_after: None,
            success: false,
            rolled_back: false,
            error: None,
        };

        // Read both sides up front; a failed read fails the item.
        let source_before = match self
            .gateway
            .api()
            .read_available(item.inventory_item_id, request.source_location)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                result.error = Some(WriteError::from_platform(&e));
                return result;
            }
        };
        result.source_before = Some(source_before);
        result.source_after = Some(source_before);

        let destination_before = match self
            .gateway
            .api()
            .read_available(item.inventory_item_id, request.destination_location)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                result.error = Some(WriteError::from_platform(&e));
                return result;
            }
        };
        result.destination_before = Some(destination_before);
        result.destination_after = Some(destination_before);

        if source_before < item.quantity {
            result.error = Some(WriteError::new(
                super::ErrorCategory::InsufficientInventory,
                format!(
                    "source has {source_before} available, cannot transfer {}",
                    item.quantity
                ),
            ));
            return result;
        }

        // Step 1: decrement the source under optimistic lock.
        let out = self
            .gateway
            .write(&Self::leg_request(
                request,
                item,
                OperationKind::TransferOut,
                request.source_location,
                Some(source_before),
            ))
            .await;

        if !out.success {
            result.error = out.error;
            return result;
        }
        result.source_after = out.new_available;

        // Step 2: increment the destination under optimistic lock.
        let in_ = self
            .gateway
            .write(&Self::leg_request(
                request,
                item,
                OperationKind::TransferIn,
                request.destination_location,
                Some(destination_before),
            ))
            .await;

        if in_.success {
            result.destination_after = in_.new_available;
            result.success = true;
            return result;
        }

        // Destination failed: restore the source. Best-effort, no expected
        // value - the restore must not be blocked by a concurrent write.
        warn!(
            transfer_id = %request.transfer_id,
            item = %item.inventory_item_id,
            "Destination adjust failed, compensating source"
        );

        let compensation = self
            .gateway
            .write(&Self::leg_request(
                request,
                item,
                OperationKind::TransferIn,
                request.source_location,
                None,
            ))
            .await;

        if compensation.success {
            result.rolled_back = true;
            result.source_after = compensation.new_available;
        } else {
            error!(
                transfer_id = %request.transfer_id,
                item = %item.inventory_item_id,
                "Compensating write failed; source and platform may diverge - manual reconciliation required"
            );
        }

        result.error = in_.error;
        result
    }

    fn leg_request(
        request: &TransferRequest,
        item: &TransferItem,
        kind: OperationKind,
        location: LocationId,
        expected: Option<i64>,
    ) -> WriteRequest {
        WriteRequest {
            kind,
            quantity: item.quantity,
            expected_available: expected,
            inventory_item_id: item.inventory_item_id,
            location_id: location,
            request_id: Uuid::new_v4(),
            sku: item.sku.clone(),
            store_key: request.store_key.clone(),
            source_function: "location_transfer",
            triggered_by: request.triggered_by.clone(),
        }
    }

    /// One audit row covering before/after at both locations.
    async fn record_transfer_audit(&self, request: &TransferRequest, item: &TransferItemResult) {
        let entry = audit::NewAuditEntry {
            action: "location_transfer",
            old_value: Some(json!({
                "sku": item.sku,
                "source_location": request.source_location,
                "source_available": item.source_before,
                "destination_location": request.destination_location,
                "destination_available": item.destination_before,
            })),
            new_value: Some(json!({
                "quantity": item.quantity,
                "source_available": item.source_after,
                "destination_available": item.destination_after,
            })),
            actor: request
                .triggered_by
                .as_deref()
                .unwrap_or("location_transfer"),
            location_id: None,
            request_id: request.transfer_id,
        };

        if let Err(e) = audit::append(self.gateway.pool(), entry).await {
            error!(error = %e, transfer_id = %request.transfer_id, "Failed to append transfer audit entry");
        }
    }
}
