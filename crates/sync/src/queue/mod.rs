//! Durable sync queue processor.
//!
//! Drains `sync_queue` rows against the platform. Processing is strictly
//! sequential with an explicit delay between items: the queue shares one
//! rate limiter with interactive writes, and two in-flight mutations
//! against the same inventory item must never race each other from inside
//! the same process.
//!
//! Per item: claim (compare-and-swap), execute, then either complete,
//! re-queue with a category-specific backoff, or - once the retry budget is
//! exhausted or the failure is non-retryable - mark failed and emit exactly
//! one dead-letter entry. Dead letters are terminal; they are never
//! auto-retried.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use slabworks_core::{EbayListingId, InventoryItemId, LocationId, ProductId};

use crate::config::QueueSettings;
use crate::db::sync_queue::{self, QueueAction, QueueItem};
use crate::db::{RepositoryError, dead_letter};
use crate::inventory::{
    ErrorCategory, InventoryApi, InventoryWriteGateway, OperationKind, WriteError, WriteRequest,
};
use crate::listings::ListingChannel;
use crate::shopify::CatalogOps;

/// Operation payload stored in `sync_queue.payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueuePayload {
    /// Replay an inventory write through the gateway.
    InventoryWrite {
        /// Operation kind.
        kind: OperationKind,
        /// Magnitude or target value.
        quantity: i64,
        /// Optimistic-lock expectation, when the enqueuer had one.
        expected_available: Option<i64>,
        /// Target inventory item.
        inventory_item_id: i64,
        /// Target location.
        location_id: i64,
        /// Logical store.
        store_key: String,
        /// Code path that enqueued the write.
        source_function: String,
    },
    /// Create a product listing from a prepared payload.
    CreateListing {
        /// Prepared product payload.
        product: serde_json::Value,
    },
    /// Delete a product listing.
    DeleteListing {
        /// Product to delete.
        product_id: i64,
    },
    /// End an eBay listing (idempotent).
    EndEbayListing {
        /// Listing to end.
        listing_id: EbayListingId,
    },
}

impl QueuePayload {
    /// Which queue action class this payload belongs to.
    #[must_use]
    pub const fn action(&self) -> QueueAction {
        match self {
            Self::CreateListing { .. } => QueueAction::Create,
            Self::InventoryWrite { .. } | Self::EndEbayListing { .. } => QueueAction::Update,
            Self::DeleteListing { .. } => QueueAction::Delete,
        }
    }
}

/// What to do with a failed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Re-queue with the given backoff.
    Retry(Duration),
    /// Terminal failure: mark failed and dead-letter.
    DeadLetter,
}

/// Decide the fate of a failed queue item.
///
/// Non-retryable categories dead-letter immediately; retryable ones are
/// re-queued with a category-specific backoff until the budget runs out.
#[must_use]
pub fn disposition(category: ErrorCategory, retry_count: i32, max_retries: i32) -> Disposition {
    if !category.is_retryable() || retry_count >= max_retries {
        return Disposition::DeadLetter;
    }
    Disposition::Retry(retry_backoff(category, retry_count))
}

/// Category-specific retry backoff.
///
/// Rate limits back off the hardest (the store bucket drains slowly);
/// server and network failures recover faster; unknown failures sit in
/// between, conservatively retryable.
#[must_use]
pub fn retry_backoff(category: ErrorCategory, retry_count: i32) -> Duration {
    let (base_secs, cap_secs) = match category {
        ErrorCategory::RateLimit => (30u64, 900u64),
        ErrorCategory::ServerError | ErrorCategory::NetworkError => (10, 300),
        _ => (15, 300),
    };
    let shift = retry_count.clamp(0, 16);
    let secs = base_secs.saturating_mul(1u64 << shift).min(cap_secs);
    Duration::from_secs(secs)
}

/// Summary of one drain pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchSummary {
    /// Items claimed and executed.
    pub processed: u32,
    /// Items completed.
    pub completed: u32,
    /// Items re-queued for retry.
    pub requeued: u32,
    /// Items dead-lettered.
    pub dead_lettered: u32,
    /// Items skipped because another processor claimed them first.
    pub claim_lost: u32,
}

/// Sequential queue processor.
pub struct QueueProcessor<A, C, L>
where
    A: InventoryApi,
    C: CatalogOps,
    L: ListingChannel,
{
    gateway: InventoryWriteGateway<A>,
    catalog: C,
    listings: L,
    settings: QueueSettings,
}

impl<A, C, L> QueueProcessor<A, C, L>
where
    A: InventoryApi,
    C: CatalogOps,
    L: ListingChannel,
{
    /// Create a processor.
    pub const fn new(
        gateway: InventoryWriteGateway<A>,
        catalog: C,
        listings: L,
        settings: QueueSettings,
    ) -> Self {
        Self {
            gateway,
            catalog,
            listings,
            settings,
        }
    }

    fn pool(&self) -> &PgPool {
        self.gateway.pool()
    }

    /// Drain one batch of due items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` when the queue tables themselves are
    /// unreachable. Per-item platform failures never abort the batch.
    #[instrument(skip(self))]
    pub async fn process_batch(&self) -> Result<BatchSummary, RepositoryError> {
        let due = sync_queue::fetch_due(self.pool(), self.settings.batch_size).await?;
        let mut summary = BatchSummary::default();

        if due.is_empty() {
            return Ok(summary);
        }

        info!(count = due.len(), "Draining sync queue batch");

        for item in due {
            if !sync_queue::claim(self.pool(), item.id).await? {
                debug!(item_id = %item.id, "Claim lost, another processor owns this item");
                summary.claim_lost += 1;
                continue;
            }
            summary.processed += 1;

            match self.process_item(&item).await {
                Ok(()) => {
                    sync_queue::mark_completed(self.pool(), item.id).await?;
                    summary.completed += 1;
                }
                Err(write_error) => match disposition(
                    write_error.category,
                    item.retry_count,
                    item.max_retries,
                ) {
                    Disposition::Retry(backoff) => {
                        let retry_after = Utc::now()
                            + chrono::Duration::from_std(backoff)
                                .unwrap_or_else(|_| chrono::Duration::seconds(300));
                        warn!(
                            item_id = %item.id,
                            category = %write_error.category,
                            retry_count = item.retry_count,
                            backoff_secs = backoff.as_secs(),
                            "Queue item failed, re-queueing"
                        );
                        sync_queue::requeue(
                            self.pool(),
                            item.id,
                            &write_error.message,
                            write_error.category.as_str(),
                            retry_after,
                        )
                        .await?;
                        summary.requeued += 1;
                    }
                    Disposition::DeadLetter => {
                        error!(
                            item_id = %item.id,
                            category = %write_error.category,
                            retry_count = item.retry_count,
                            "Queue item permanently failed, dead-lettering"
                        );
                        sync_queue::mark_failed(
                            self.pool(),
                            item.id,
                            &write_error.message,
                            write_error.category.as_str(),
                        )
                        .await?;
                        dead_letter::create(self.pool(), &item, &write_error).await?;
                        summary.dead_lettered += 1;
                    }
                },
            }

            tokio::time::sleep(self.settings.inter_item_delay).await;
        }

        info!(
            processed = summary.processed,
            completed = summary.completed,
            requeued = summary.requeued,
            dead_lettered = summary.dead_lettered,
            "Sync queue batch finished"
        );

        Ok(summary)
    }

    /// Execute one claimed item.
    async fn process_item(&self, item: &QueueItem) -> Result<(), WriteError> {
        let payload: QueuePayload = serde_json::from_value(item.payload.clone()).map_err(|e| {
            // An undecodable payload can never succeed; fail it terminally.
            WriteError::validation(format!("undecodable queue payload: {e}"))
        })?;

        match payload {
            QueuePayload::InventoryWrite {
                kind,
                quantity,
                expected_available,
                inventory_item_id,
                location_id,
                store_key,
                source_function,
            } => {
                let request = WriteRequest {
                    kind,
                    quantity,
                    expected_available,
                    inventory_item_id: InventoryItemId::new(inventory_item_id),
                    location_id: LocationId::new(location_id),
                    request_id: uuid::Uuid::new_v4(),
                    sku: item.sku.clone(),
                    store_key,
                    source_function: "sync_queue",
                    triggered_by: Some(source_function),
                };

                let result = self.gateway.write(&request).await;
                if result.success {
                    Ok(())
                } else {
                    Err(result.error.unwrap_or_else(|| {
                        WriteError::new(ErrorCategory::Unknown, "write failed without detail")
                    }))
                }
            }
            QueuePayload::CreateListing { product } => self
                .catalog
                .create_listing(&product)
                .await
                .map_err(|e| WriteError::from_platform(&e)),
            QueuePayload::DeleteListing { product_id } => self
                .catalog
                .delete_listing(ProductId::new(product_id))
                .await
                .map_err(|e| WriteError::from_platform(&e)),
            QueuePayload::EndEbayListing { listing_id } => self
                .listings
                .end_listing(&listing_id)
                .await
                .map_err(|e| match e {
                    crate::listings::ListingError::Http(_) => {
                        WriteError::new(ErrorCategory::NetworkError, e.to_string())
                    }
                    crate::listings::ListingError::Rejected { status, .. }
                        if (500..600).contains(&status) =>
                    {
                        WriteError::new(ErrorCategory::ServerError, e.to_string())
                    }
                    crate::listings::ListingError::Rejected { .. } => {
                        WriteError::new(ErrorCategory::ClientError, e.to_string())
                    }
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_action_mapping() {
        let write = QueuePayload::InventoryWrite {
            kind: OperationKind::Sale,
            quantity: 1,
            expected_available: None,
            inventory_item_id: 1,
            location_id: 2,
            store_key: "slabworks".to_string(),
            source_function: "test".to_string(),
        };
        assert_eq!(write.action(), QueueAction::Update);

        let create = QueuePayload::CreateListing {
            product: serde_json::json!({"title": "PSA 10 Charizard"}),
        };
        assert_eq!(create.action(), QueueAction::Create);

        let delete = QueuePayload::DeleteListing { product_id: 9 };
        assert_eq!(delete.action(), QueueAction::Delete);

        let end = QueuePayload::EndEbayListing {
            listing_id: EbayListingId::new("110553577398"),
        };
        assert_eq!(end.action(), QueueAction::Update);
    }

    #[test]
    fn test_payload_round_trips_through_json() {
        let payload = QueuePayload::InventoryWrite {
            kind: OperationKind::CrossChannelZero,
            quantity: 0,
            expected_available: None,
            inventory_item_id: 42,
            location_id: 7,
            store_key: "slabworks".to_string(),
            source_function: "cross_channel_reconcile".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["op"], "inventory_write");
        let back: QueuePayload = serde_json::from_value(json).unwrap();
        assert!(matches!(back, QueuePayload::InventoryWrite { quantity: 0, .. }));
    }

    #[test]
    fn test_retryable_failure_within_budget_retries() {
        let d = disposition(ErrorCategory::ServerError, 0, 5);
        assert!(matches!(d, Disposition::Retry(_)));

        let d = disposition(ErrorCategory::RateLimit, 4, 5);
        assert!(matches!(d, Disposition::Retry(_)));
    }

    #[test]
    fn test_exhausted_budget_dead_letters() {
        assert_eq!(
            disposition(ErrorCategory::ServerError, 5, 5),
            Disposition::DeadLetter
        );
        assert_eq!(
            disposition(ErrorCategory::NetworkError, 7, 5),
            Disposition::DeadLetter
        );
    }

    #[test]
    fn test_non_retryable_dead_letters_immediately() {
        assert_eq!(
            disposition(ErrorCategory::ValidationError, 0, 5),
            Disposition::DeadLetter
        );
        assert_eq!(
            disposition(ErrorCategory::InsufficientInventory, 0, 5),
            Disposition::DeadLetter
        );
        assert_eq!(
            disposition(ErrorCategory::StaleData, 0, 5),
            Disposition::DeadLetter
        );
    }

    #[test]
    fn test_backoff_grows_per_category_and_caps() {
        // Rate limits back off harder than server errors.
        assert!(
            retry_backoff(ErrorCategory::RateLimit, 0)
                > retry_backoff(ErrorCategory::ServerError, 0)
        );

        // Monotone growth up to the cap.
        let b0 = retry_backoff(ErrorCategory::ServerError, 0);
        let b1 = retry_backoff(ErrorCategory::ServerError, 1);
        let b2 = retry_backoff(ErrorCategory::ServerError, 2);
        assert!(b0 < b1 && b1 < b2);

        // Caps hold for absurd retry counts.
        assert_eq!(
            retry_backoff(ErrorCategory::RateLimit, 40),
            Duration::from_secs(900)
        );
        assert_eq!(
            retry_backoff(ErrorCategory::Unknown, 40),
            Duration::from_secs(300)
        );
    }
}
