//! Sales channels an inventory unit can be listed on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A sales channel.
///
/// Slabworks lists every card on Shopify (the authoritative inventory
/// system) and optionally on eBay. A sale on either channel must be
/// reconciled onto the other one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(
    feature = "postgres",
    derive(sqlx::Type),
    sqlx(type_name = "sales_channel", rename_all = "lowercase")
)]
pub enum Channel {
    /// Shopify storefront (sole source of truth for quantities).
    Shopify,
    /// eBay listings (secondary channel).
    Ebay,
}

impl Channel {
    /// The other channel in the two-channel world.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Shopify => Self::Ebay,
            Self::Ebay => Self::Shopify,
        }
    }

    /// Stable lowercase name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shopify => "shopify",
            Self::Ebay => "ebay",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An eBay listing (item) identifier.
///
/// eBay item IDs are decimal strings but are treated as opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
pub struct EbayListingId(String);

impl EbayListingId {
    /// Create a listing ID from its string form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the listing ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EbayListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterpart_is_involutive() {
        assert_eq!(Channel::Shopify.counterpart(), Channel::Ebay);
        assert_eq!(Channel::Ebay.counterpart(), Channel::Shopify);
        assert_eq!(Channel::Shopify.counterpart().counterpart(), Channel::Shopify);
    }

    #[test]
    fn test_channel_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Channel::Ebay).unwrap(), "\"ebay\"");
        let back: Channel = serde_json::from_str("\"shopify\"").unwrap();
        assert_eq!(back, Channel::Shopify);
    }
}
