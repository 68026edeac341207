//! Slabworks Sync - Inventory write-safety and reconciliation engine.
//!
//! This crate owns every mutation of inventory quantities on the external
//! platform (Shopify) and keeps the eBay channel converged with it. Nothing
//! else in Slabworks is allowed to write quantities directly.
//!
//! # Guarantees
//!
//! - Available quantity never goes negative: every delta write is projected
//!   against a fresh authoritative read and rejected if it would underflow.
//! - No double-apply: callers supply `expected_available` for optimistic
//!   locking, queue items are claimed with a single-row compare-and-swap,
//!   and sold events are deduplicated by `(sku, source, source_event_id)`.
//! - Partial failures of two-step operations (location transfers) trigger a
//!   compensating write; cross-channel updates that fail are deferred to the
//!   durable sync queue instead of failing the sale.
//! - Every write attempt, successful or not, produces exactly one audit row
//!   keyed by a per-attempt request ID.
//!
//! # Non-guarantees
//!
//! Shopify remains the sole source of truth. The local inventory-level cache
//! is a best-effort read mirror, and saga rollback is best-effort: if a
//! compensating write itself fails, the periodic cache healer and the audit
//! trail are the recovery path, not a transaction manager.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod inventory;
pub mod listings;
pub mod queue;
pub mod shopify;
