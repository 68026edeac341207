//! Cross-channel sale reconciliation.
//!
//! A card sold on one channel must disappear from the other one before it
//! oversells. The entry point is an idempotent "sold" event: the claim
//! store atomically claims `(sku, source, source_event_id)`, and only the
//! first claim triggers cross-channel work. The sale itself never rolls
//! back because a secondary channel update failed - failed updates are
//! deferred into the durable sync queue, where retries are safe because
//! the target operations (set to zero, end listing) are idempotent.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use slabworks_core::{Channel, EbayListingId, InventoryItemId, LocationId, Sku};

use crate::db::RepositoryError;
use crate::db::sync_queue::{self, NewQueueItem};
use crate::listings::ListingChannel;
use crate::queue::QueuePayload;

use super::{InventoryApi, InventoryWriteGateway, OperationKind, WriteRequest};

/// Result of the atomic sale claim.
///
/// All four variants are success from the caller's perspective; only
/// `Sold` triggers cross-channel action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleClaim {
    /// First claim for this event; the item is now marked sold.
    Sold,
    /// The item was already sold by an earlier, different event.
    AlreadySold,
    /// This exact event was already processed.
    DuplicateEvent,
    /// The SKU is unknown.
    NotFound,
}

/// An authoritative sold event from one channel.
#[derive(Debug, Clone)]
pub struct SaleEvent {
    /// SKU that sold.
    pub sku: Sku,
    /// Channel the sale happened on.
    pub source: Channel,
    /// Unique event ID from the source channel (order line, transaction).
    pub source_event_id: String,
    /// Shopify inventory item, when the item is listed on Shopify.
    pub shopify_inventory_item_id: Option<InventoryItemId>,
    /// Shopify location carrying the listing quantity.
    pub shopify_location_id: Option<LocationId>,
    /// eBay listing, when the item is listed on eBay.
    pub ebay_listing_id: Option<EbayListingId>,
    /// Logical store the item belongs to.
    pub store_key: String,
}

/// Atomic claim of a sold event. External collaborator.
pub trait SaleClaimStore {
    /// Claim `(sku, source, source_event_id)`, returning what the claim
    /// found. Must be atomic: two concurrent claims for the same event must
    /// resolve to one `Sold` and one `DuplicateEvent`.
    fn claim_sale(
        &self,
        sku: &Sku,
        source: Channel,
        source_event_id: &str,
    ) -> impl Future<Output = Result<SaleClaim, RepositoryError>>;
}

impl<S: SaleClaimStore> SaleClaimStore for &S {
    fn claim_sale(
        &self,
        sku: &Sku,
        source: Channel,
        source_event_id: &str,
    ) -> impl Future<Output = Result<SaleClaim, RepositoryError>> {
        (**self).claim_sale(sku, source, source_event_id)
    }
}

/// Where deferred cross-channel follow-ups go.
pub trait CompensationQueue {
    /// Enqueue a follow-up action for the background processor.
    fn enqueue_compensation(
        &self,
        item: NewQueueItem,
    ) -> impl Future<Output = Result<Uuid, RepositoryError>>;
}

impl<Q: CompensationQueue> CompensationQueue for &Q {
    fn enqueue_compensation(
        &self,
        item: NewQueueItem,
    ) -> impl Future<Output = Result<Uuid, RepositoryError>> {
        (**self).enqueue_compensation(item)
    }
}

impl CompensationQueue for sqlx::PgPool {
    async fn enqueue_compensation(&self, item: NewQueueItem) -> Result<Uuid, RepositoryError> {
        let row = sync_queue::enqueue(self, item).await?;
        Ok(row.id)
    }
}

/// What happened on the other channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossChannelStatus {
    /// No cross-channel work was needed (duplicate event, not listed there).
    NotNeeded,
    /// The other channel was updated immediately.
    Updated,
    /// The immediate attempt failed; a compensating queue item will retry.
    Deferred,
    /// The immediate attempt and the deferral both failed; manual follow-up.
    Unreconciled,
}

/// Outcome of handling a sold event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// What the claim found.
    pub claim: SaleClaim,
    /// What happened on the other channel.
    pub cross_channel: CrossChannelStatus,
}

/// Drives the matching write on the other channel after a sale.
pub struct CrossChannelReconciler<A, S, L, Q>
where
    A: InventoryApi,
    S: SaleClaimStore,
    L: ListingChannel,
    Q: CompensationQueue,
{
    gateway: InventoryWriteGateway<A>,
    claims: S,
    listings: L,
    compensation: Q,
    default_max_retries: i32,
}

impl<A, S, L, Q> CrossChannelReconciler<A, S, L, Q>
where
    A: InventoryApi,
    S: SaleClaimStore,
    L: ListingChannel,
    Q: CompensationQueue,
{
    /// Create a reconciler.
    pub const fn new(
        gateway: InventoryWriteGateway<A>,
        claims: S,
        listings: L,
        compensation: Q,
        default_max_retries: i32,
    ) -> Self {
        Self {
            gateway,
            claims,
            listings,
            compensation,
            default_max_retries,
        }
    }

    /// Handle a sold event.
    ///
    /// Safe to replay: a repeated event resolves to `DuplicateEvent` and
    /// performs no cross-channel work.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` only when the claim itself cannot be
    /// recorded - every later failure is deferred, never propagated.
    #[instrument(
        skip(self, event),
        fields(sku = %event.sku, source = %event.source, event_id = %event.source_event_id)
    )]
    pub async fn handle_sale(&self, event: &SaleEvent) -> Result<ReconcileOutcome, RepositoryError> {
        let claim = self
            .claims
            .claim_sale(&event.sku, event.source, &event.source_event_id)
            .await?;

        match claim {
            SaleClaim::Sold => {}
            SaleClaim::AlreadySold | SaleClaim::DuplicateEvent | SaleClaim::NotFound => {
                info!(claim = ?claim, "No cross-channel action for sold event");
                return Ok(ReconcileOutcome {
                    claim,
                    cross_channel: CrossChannelStatus::NotNeeded,
                });
            }
        }

        let cross_channel = match event.source.counterpart() {
            Channel::Shopify => self.zero_shopify(event).await,
            Channel::Ebay => self.end_ebay_listing(event).await,
        };

        Ok(ReconcileOutcome {
            claim,
            cross_channel,
        })
    }

    /// A sale on eBay zeroes the Shopify quantity.
    async fn zero_shopify(&self, event: &SaleEvent) -> CrossChannelStatus {
        let (Some(item), Some(location)) =
            (event.shopify_inventory_item_id, event.shopify_location_id)
        else {
            return CrossChannelStatus::NotNeeded;
        };

        let request = WriteRequest {
            kind: OperationKind::CrossChannelZero,
            quantity: 0,
            expected_available: None,
            inventory_item_id: item,
            location_id: location,
            request_id: Uuid::new_v4(),
            sku: Some(event.sku.clone()),
            store_key: event.store_key.clone(),
            source_function: "cross_channel_reconcile",
            triggered_by: Some(format!("{}:{}", event.source, event.source_event_id)),
        };

        let result = self.gateway.write(&request).await;
        if result.success {
            return CrossChannelStatus::Updated;
        }

        warn!(
            error = ?result.error,
            "Immediate cross-channel zero failed, deferring to sync queue"
        );
        self.defer(
            event,
            QueuePayload::InventoryWrite {
                kind: OperationKind::CrossChannelZero,
                quantity: 0,
                expected_available: None,
                inventory_item_id: item.as_i64(),
                location_id: location.as_i64(),
                store_key: event.store_key.clone(),
                source_function: "cross_channel_reconcile".to_string(),
            },
        )
        .await
    }

    /// A sale on Shopify ends the eBay listing.
    async fn end_ebay_listing(&self, event: &SaleEvent) -> CrossChannelStatus {
        let Some(listing_id) = &event.ebay_listing_id else {
            return CrossChannelStatus::NotNeeded;
        };

        match self.listings.end_listing(listing_id).await {
            Ok(()) => CrossChannelStatus::Updated,
            Err(e) => {
                warn!(error = %e, "Immediate end-listing failed, deferring to sync queue");
                self.defer(
                    event,
                    QueuePayload::EndEbayListing {
                        listing_id: listing_id.clone(),
                    },
                )
                .await
            }
        }
    }

    async fn defer(&self, event: &SaleEvent, payload: QueuePayload) -> CrossChannelStatus {
        let action = payload.action();
        let payload_json = match serde_json::to_value(&payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize compensation payload");
                return CrossChannelStatus::Unreconciled;
            }
        };

        let item = NewQueueItem {
            sku: Some(event.sku.clone()),
            action,
            payload: payload_json,
            max_retries: self.default_max_retries,
        };

        match self.compensation.enqueue_compensation(item).await {
            Ok(id) => {
                info!(queue_item_id = %id, "Compensating action queued");
                CrossChannelStatus::Deferred
            }
            Err(e) => {
                // The sale still stands; this item needs manual attention.
                tracing::error!(error = %e, "Failed to queue compensating action");
                CrossChannelStatus::Unreconciled
            }
        }
    }
}
