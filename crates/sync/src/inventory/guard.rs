//! Optimistic concurrency guard around the platform mutation calls.
//!
//! Shopify offers no shared transaction context, so this read-check-write
//! sequence is the only concurrency control available. It is explicitly
//! optimistic: concurrent writers race to read-then-write, and only the
//! stale check detects a lost update. Callers that omit `expected` accept
//! last-writer-wins semantics.

use tracing::{debug, instrument};

use slabworks_core::{InventoryItemId, LocationId};

use super::{ApiClass, ErrorCategory, InventoryApi, OperationKind, WriteError};

/// Outcome of a guarded mutation attempt.
#[derive(Debug, Clone)]
pub struct GuardOutcome {
    /// Whether the mutation was applied.
    pub success: bool,
    /// Authoritative quantity read before mutating, when the read succeeded.
    pub previous: Option<i64>,
    /// Quantity after the mutation (platform-reported, or projected).
    pub new: Option<i64>,
    /// True when `expected` diverged from the authoritative read.
    pub stale: bool,
    /// Failure detail, when not successful.
    pub error: Option<WriteError>,
}

impl GuardOutcome {
    fn applied(previous: i64, new: i64) -> Self {
        Self {
            success: true,
            previous: Some(previous),
            new: Some(new),
            stale: false,
            error: None,
        }
    }

    fn failed(previous: Option<i64>, error: WriteError) -> Self {
        Self {
            success: false,
            previous,
            new: None,
            stale: false,
            error: Some(error),
        }
    }

    fn stale(expected: i64, actual: i64) -> Self {
        Self {
            success: false,
            previous: Some(actual),
            new: None,
            stale: true,
            error: Some(WriteError::new(
                ErrorCategory::StaleData,
                format!("expected available {expected}, authoritative value is {actual}"),
            )),
        }
    }
}

/// Safe adjust / safe set over an [`InventoryApi`].
pub struct OptimisticLockGuard<'a, A: InventoryApi> {
    api: &'a A,
}

impl<'a, A: InventoryApi> OptimisticLockGuard<'a, A> {
    /// Wrap a platform API.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Apply a mutation with the full safety sequence:
    ///
    /// 1. Read the authoritative quantity; a failed read fails the write
    ///    (fail-closed, no blind mutation).
    /// 2. If `expected` was supplied and differs, reject as stale without
    ///    mutating.
    /// 3. For delta operations, reject a negative projection without
    ///    mutating.
    /// 4. Issue the mutation.
    /// 5. Report the platform's new value, falling back to the local
    ///    projection when the response omits it.
    ///
    /// `value` is the signed delta for delta operations and the absolute
    /// target for set operations.
    #[instrument(skip(self), fields(kind = %kind, item = %item, location = %location))]
    pub async fn apply(
        &self,
        kind: OperationKind,
        item: InventoryItemId,
        location: LocationId,
        value: i64,
        expected: Option<i64>,
    ) -> GuardOutcome {
        let previous = match self.api.read_available(item, location).await {
            Ok(available) => available,
            Err(e) => {
                debug!(error = %e, "Authoritative read failed, failing closed");
                return GuardOutcome::failed(None, WriteError::from_platform(&e));
            }
        };

        if let Some(expected) = expected
            && expected != previous
        {
            debug!(expected, actual = previous, "Stale write rejected");
            return GuardOutcome::stale(expected, previous);
        }

        match kind.api_class() {
            ApiClass::Delta => {
                let projected = previous + value;
                if projected < 0 {
                    return GuardOutcome::failed(
                        Some(previous),
                        WriteError::new(
                            ErrorCategory::InsufficientInventory,
                            format!(
                                "adjust by {value} would drive available below zero (current {previous})"
                            ),
                        ),
                    );
                }

                match self.api.adjust_available(item, location, value).await {
                    Ok(reported) => {
                        GuardOutcome::applied(previous, reported.unwrap_or(projected))
                    }
                    Err(e) => GuardOutcome::failed(Some(previous), WriteError::from_platform(&e)),
                }
            }
            ApiClass::Absolute => match self.api.set_available(item, location, value).await {
                Ok(reported) => GuardOutcome::applied(previous, reported.unwrap_or(value)),
                Err(e) => GuardOutcome::failed(Some(previous), WriteError::from_platform(&e)),
            },
        }
    }
}
