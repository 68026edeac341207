//! Inventory write-safety primitives.
//!
//! Everything that mutates a quantity goes through this module:
//!
//! - [`InventoryWriteGateway`] - the single entry point for all writes
//! - [`OptimisticLockGuard`] - read-check-write against the platform truth
//! - [`LocationTransferOrchestrator`] - two-step transfer saga
//! - [`CrossChannelReconciler`] - sold-event fan-out to the other channel
//! - [`CacheHealer`] - periodic mirror repair
//!
//! The operation taxonomy is fixed at design time: six delta operations and
//! three absolute operations. New mutation paths must be added here, never
//! as direct platform calls elsewhere.

mod gateway;
mod guard;
mod healer;
mod reconcile;
mod transfer;

pub use gateway::InventoryWriteGateway;
pub use guard::{GuardOutcome, OptimisticLockGuard};
pub use healer::CacheHealer;
pub use reconcile::{
    CompensationQueue, CrossChannelReconciler, CrossChannelStatus, ReconcileOutcome, SaleClaim,
    SaleClaimStore, SaleEvent,
};
pub use transfer::{
    LocationTransferOrchestrator, TransferItem, TransferItemResult, TransferOutcome,
    TransferRequest, TransferStatus,
};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use slabworks_core::{InventoryItemId, LocationId, Sku};

use crate::shopify::ShopifyError;

// =============================================================================
// Platform seam
// =============================================================================

/// The three platform calls the write path is built on.
///
/// Implemented by `ShopifyClient` in production and by in-memory mocks in
/// tests. Adjust and set return the platform-reported new quantity when the
/// response carries one.
pub trait InventoryApi {
    /// Read the current authoritative available quantity.
    fn read_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
    ) -> impl Future<Output = Result<i64, ShopifyError>>;

    /// Apply a signed delta to the available quantity.
    fn adjust_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
        delta: i64,
    ) -> impl Future<Output = Result<Option<i64>, ShopifyError>>;

    /// Pin the available quantity to an absolute value.
    fn set_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
        quantity: i64,
    ) -> impl Future<Output = Result<Option<i64>, ShopifyError>>;
}

impl<A: InventoryApi> InventoryApi for &A {
    fn read_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
    ) -> impl Future<Output = Result<i64, ShopifyError>> {
        (**self).read_available(item, location)
    }

    fn adjust_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
        delta: i64,
    ) -> impl Future<Output = Result<Option<i64>, ShopifyError>> {
        (**self).adjust_available(item, location, delta)
    }

    fn set_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
        quantity: i64,
    ) -> impl Future<Output = Result<Option<i64>, ShopifyError>> {
        (**self).set_available(item, location, quantity)
    }
}

// =============================================================================
// Operation taxonomy
// =============================================================================

/// Which platform API class a write uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiClass {
    /// Signed adjustment relative to the current quantity.
    Delta,
    /// Exact target value.
    Absolute,
}

/// The fixed set of inventory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Stock received from intake (+).
    Receiving,
    /// Outbound leg of a location transfer (-).
    TransferOut,
    /// Inbound leg of a location transfer (+).
    TransferIn,
    /// Refund restores stock (+).
    Refund,
    /// Staff correction, caller supplies the sign.
    ManualAdjust,
    /// Sale consumes stock (-).
    Sale,
    /// Pin a graded 1-of-1 slab to owned (1) or sold (0).
    EnforceGraded,
    /// First-time quantity for a newly tracked item.
    InitialSet,
    /// Zero-out driven by a sale on another channel.
    CrossChannelZero,
}

impl OperationKind {
    /// Which API class this operation uses.
    #[must_use]
    pub const fn api_class(self) -> ApiClass {
        match self {
            Self::Receiving
            | Self::TransferOut
            | Self::TransferIn
            | Self::Refund
            | Self::ManualAdjust
            | Self::Sale => ApiClass::Delta,
            Self::EnforceGraded | Self::InitialSet | Self::CrossChannelZero => ApiClass::Absolute,
        }
    }

    /// Signed magnitude for delta operations; `None` for absolute ones.
    ///
    /// Additive kinds take `|quantity|`, subtractive kinds take
    /// `-|quantity|`, and `ManualAdjust` passes the caller's sign through.
    #[must_use]
    pub const fn signed_delta(self, quantity: i64) -> Option<i64> {
        match self {
            Self::Receiving | Self::TransferIn | Self::Refund => Some(quantity.abs()),
            Self::TransferOut | Self::Sale => Some(-quantity.abs()),
            Self::ManualAdjust => Some(quantity),
            Self::EnforceGraded | Self::InitialSet | Self::CrossChannelZero => None,
        }
    }

    /// Validate operation-specific quantity constraints.
    ///
    /// Runs before any network call; a rejection here is still audited.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` write error when the quantity is outside the
    /// operation's fixed domain.
    pub fn validate(self, quantity: i64) -> Result<(), WriteError> {
        match self {
            Self::EnforceGraded if !matches!(quantity, 0 | 1) => Err(WriteError::validation(
                format!("enforce_graded accepts only 0 or 1, got {quantity}"),
            )),
            Self::CrossChannelZero if quantity != 0 => Err(WriteError::validation(format!(
                "cross_channel_zero accepts only 0, got {quantity}"
            ))),
            Self::InitialSet if quantity < 0 => Err(WriteError::validation(format!(
                "initial_set requires a non-negative quantity, got {quantity}"
            ))),
            _ => Ok(()),
        }
    }

    /// Stable snake_case name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receiving => "receiving",
            Self::TransferOut => "transfer_out",
            Self::TransferIn => "transfer_in",
            Self::Refund => "refund",
            Self::ManualAdjust => "manual_adjust",
            Self::Sale => "sale",
            Self::EnforceGraded => "enforce_graded",
            Self::InitialSet => "initial_set",
            Self::CrossChannelZero => "cross_channel_zero",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Error taxonomy
// =============================================================================

/// Failure categories for write attempts.
///
/// The category decides retry behavior everywhere: the transport retries the
/// transient classes, the queue re-schedules them, and the terminal classes
/// surface to the caller immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Bad action/quantity combination. No network call was made.
    ValidationError,
    /// Optimistic-lock mismatch. Caller must refresh and resubmit.
    StaleData,
    /// The write would drive the quantity negative.
    InsufficientInventory,
    /// HTTP 429 after retries.
    RateLimit,
    /// HTTP 5xx after retries.
    ServerError,
    /// Transport failure after retries.
    NetworkError,
    /// Item/location unknown to the platform.
    NotFound,
    /// Other 4xx - caller error, never retried.
    ClientError,
    /// Anything unclassified; treated conservatively as retryable.
    Unknown,
}

impl ErrorCategory {
    /// Whether the queue may re-schedule a failure of this category.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        match self {
            Self::RateLimit | Self::ServerError | Self::NetworkError | Self::Unknown => true,
            Self::ValidationError
            | Self::StaleData
            | Self::InsufficientInventory
            | Self::NotFound
            | Self::ClientError => false,
        }
    }

    /// Classify a platform error.
    #[must_use]
    pub const fn from_platform(error: &ShopifyError) -> Self {
        match error {
            ShopifyError::Http(_) => Self::NetworkError,
            ShopifyError::RateLimited { .. } => Self::RateLimit,
            ShopifyError::Server { .. } => Self::ServerError,
            ShopifyError::NotFound(_) => Self::NotFound,
            ShopifyError::Client { .. } | ShopifyError::Unauthorized(_) => Self::ClientError,
            ShopifyError::Parse(_) => Self::Unknown,
        }
    }

    /// Stable SCREAMING_SNAKE_CASE name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::StaleData => "STALE_DATA",
            Self::InsufficientInventory => "INSUFFICIENT_INVENTORY",
            Self::RateLimit => "RATE_LIMIT",
            Self::ServerError => "SERVER_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::ClientError => "CLIENT_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A categorized write failure.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{category}: {message}")]
pub struct WriteError {
    /// Failure category driving retry behavior.
    pub category: ErrorCategory,
    /// Diagnostic detail. Kept out of user-facing responses.
    pub message: String,
}

impl WriteError {
    /// Construct an error in the given category.
    #[must_use]
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// Construct a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ValidationError, message)
    }

    /// Construct from a platform error.
    #[must_use]
    pub fn from_platform(error: &ShopifyError) -> Self {
        Self::new(ErrorCategory::from_platform(error), error.to_string())
    }
}

// =============================================================================
// Write request / result
// =============================================================================

/// A single inventory mutation request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// What kind of mutation this is.
    pub kind: OperationKind,
    /// Magnitude for delta operations, target value for absolute ones.
    /// `ManualAdjust` interprets this as already signed.
    pub quantity: i64,
    /// Optimistic-lock expectation. `None` accepts last-writer-wins.
    pub expected_available: Option<i64>,
    /// Target inventory item.
    pub inventory_item_id: InventoryItemId,
    /// Target location.
    pub location_id: LocationId,
    /// Per-attempt correlation ID; keys the audit entry.
    pub request_id: Uuid,
    /// SKU, when the caller knows it (for audit context).
    pub sku: Option<Sku>,
    /// Logical store the write belongs to.
    pub store_key: String,
    /// Code path that issued the write (e.g., `"location_transfer"`).
    pub source_function: &'static str,
    /// Human or system actor that triggered the write.
    pub triggered_by: Option<String>,
}

/// Outcome of a single write attempt.
///
/// One `WriteResult` always corresponds to exactly one audit entry.
#[derive(Debug, Clone)]
pub struct WriteResult {
    /// Whether the mutation was applied.
    pub success: bool,
    /// Which API class was (or would have been) used.
    pub api_used: ApiClass,
    /// Authoritative quantity observed before the write, when read.
    pub previous_available: Option<i64>,
    /// Quantity after the write (platform-reported, or projected).
    pub new_available: Option<i64>,
    /// Failure detail, when not successful.
    pub error: Option<WriteError>,
    /// True when rejected by the optimistic-lock check.
    pub stale: bool,
    /// End-to-end latency of the attempt.
    pub latency_ms: u64,
    /// Correlation ID copied from the request.
    pub request_id: Uuid,
}

impl WriteResult {
    /// Sanitized message for interactive callers.
    ///
    /// Full diagnostic detail stays in the audit/error logs; callers get the
    /// category and the correlation ID to quote when asking for help.
    #[must_use]
    pub fn client_message(&self) -> String {
        match &self.error {
            None => format!("ok (request {})", self.request_id),
            Some(e) => format!("{} (request {})", e.category, self.request_id),
        }
    }
}
