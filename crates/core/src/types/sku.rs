//! Validated SKU newtype.
//!
//! SKUs are the cross-channel identity of an inventory unit: the same SKU
//! string names the same physical card on Shopify and on eBay. Graded slabs
//! carry their certificate number in the SKU, so a SKU is never empty and
//! never padded with whitespace.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing a [`Sku`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SkuError {
    /// SKU was empty or whitespace-only.
    #[error("SKU must not be empty")]
    Empty,

    /// SKU exceeded the maximum length accepted by the sales channels.
    #[error("SKU exceeds {max} characters: {len}")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
        /// Actual length of the rejected input.
        len: usize,
    },
}

/// Maximum SKU length accepted by both sales channels (eBay custom label limit).
const MAX_SKU_LENGTH: usize = 50;

/// A validated stock-keeping unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
pub struct Sku(String);

impl Sku {
    /// Create a SKU, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SkuError::Empty`] if the trimmed input is empty and
    /// [`SkuError::TooLong`] if it exceeds the channel limit.
    pub fn new(raw: impl Into<String>) -> Result<Self, SkuError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SkuError::Empty);
        }
        if trimmed.len() > MAX_SKU_LENGTH {
            return Err(SkuError::TooLong {
                max: MAX_SKU_LENGTH,
                len: trimmed.len(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// View the SKU as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Sku {
    type Error = SkuError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_trims_whitespace() {
        let sku = Sku::new("  PSA-10-123456  ").unwrap();
        assert_eq!(sku.as_str(), "PSA-10-123456");
    }

    #[test]
    fn test_empty_sku_rejected() {
        assert_eq!(Sku::new("   "), Err(SkuError::Empty));
        assert_eq!(Sku::new(""), Err(SkuError::Empty));
    }

    #[test]
    fn test_overlong_sku_rejected() {
        let raw = "X".repeat(51);
        assert_eq!(
            Sku::new(raw),
            Err(SkuError::TooLong { max: 50, len: 51 })
        );
    }

    #[test]
    fn test_sku_serde_transparent() {
        let sku = Sku::new("BGS-95-0042").unwrap();
        let json = serde_json::to_string(&sku).unwrap();
        assert_eq!(json, "\"BGS-95-0042\"");
    }
}
