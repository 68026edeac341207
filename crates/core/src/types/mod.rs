//! Core types for Slabworks.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod channel;
pub mod id;
pub mod sku;

pub use channel::{Channel, EbayListingId};
pub use id::*;
pub use sku::{Sku, SkuError};
