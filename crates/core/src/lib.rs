//! Slabworks Core - Shared types library.
//!
//! This crate provides common types used across all Slabworks components:
//! - `sync` - Inventory write-safety and reconciliation engine
//! - `cli` - Command-line tools for migrations and queue management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, SKUs, and sales channels

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
