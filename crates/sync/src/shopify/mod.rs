//! Shopify Admin API client (HIGH PRIVILEGE).
//!
//! # Security
//!
//! **CRITICAL: This module holds the Shopify Admin API access token.**
//!
//! The token has full write access to inventory levels across every
//! location. The sync worker must only run on trusted infrastructure.
//!
//! # Architecture
//!
//! - Plain REST calls to the inventory-level endpoints (`set.json`,
//!   `adjust.json`, `inventory_levels.json`) via `reqwest`
//! - Every outbound call passes through the shared token-bucket
//!   [`RateLimiter`] and the retrying transport in [`retry`]
//! - Non-retryable responses (4xx except 429) surface immediately

mod catalog;
mod client;
mod rate_limit;
mod retry;

pub use catalog::CatalogOps;
pub use client::{InventoryLevel, ShopifyClient};
pub use rate_limit::RateLimiter;
pub use retry::{BackoffPolicy, RetryClass};

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// Network-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limited after exhausting retries.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Value of the last `Retry-After` header, if Shopify sent one.
        retry_after_secs: Option<u64>,
    },

    /// Server error (5xx) after exhausting retries.
    #[error("Server error {status}: {body}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Client error (4xx other than 401/404/429) - never retried.
    #[error("Client error {status}: {body}")]
    Client {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopify_error_display() {
        let err = ShopifyError::NotFound("inventory level 123/456".to_string());
        assert_eq!(err.to_string(), "Not found: inventory level 123/456");

        let err = ShopifyError::Server {
            status: 503,
            body: "upstream timeout".to_string(),
        };
        assert_eq!(err.to_string(), "Server error 503: upstream timeout");
    }

    #[test]
    fn test_rate_limited_error_display() {
        let err = ShopifyError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(err.to_string().contains("30"));
    }
}
