//! Secondary-channel listing management seam.
//!
//! The eBay listing service is an external collaborator: it owns the eBay
//! credentials and listing state. The sync engine only needs its idempotent
//! end-listing operation, so that is the whole trait. Ending an already
//! ended listing is a no-op on the service side, which is what makes
//! compensating retries safe to repeat indefinitely.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::instrument;

use slabworks_core::EbayListingId;

use crate::config::ListingServiceConfig;

/// Errors from the listing service.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Network-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the request.
    #[error("Listing service rejected request ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

/// End-listing operations on the secondary channel.
pub trait ListingChannel {
    /// End a listing. Idempotent: ending an ended listing succeeds.
    fn end_listing(
        &self,
        listing_id: &EbayListingId,
    ) -> impl Future<Output = Result<(), ListingError>>;
}

impl<L: ListingChannel> ListingChannel for &L {
    fn end_listing(
        &self,
        listing_id: &EbayListingId,
    ) -> impl Future<Output = Result<(), ListingError>> {
        (**self).end_listing(listing_id)
    }
}

/// HTTP client for the listing-management service.
#[derive(Clone)]
pub struct HttpListingClient {
    inner: Arc<HttpListingClientInner>,
}

struct HttpListingClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpListingClient {
    /// Create a client for the configured listing service.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &ListingServiceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(HttpListingClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        }
    }
}

impl ListingChannel for HttpListingClient {
    /// # Errors
    ///
    /// Returns `ListingError::Rejected` for non-2xx responses and
    /// `ListingError::Http` for transport failures.
    #[instrument(skip(self), fields(listing_id = %listing_id))]
    async fn end_listing(&self, listing_id: &EbayListingId) -> Result<(), ListingError> {
        let url = format!("{}/listings/{listing_id}/end", self.inner.base_url);
        let response = self.inner.client.post(&url).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        body.truncate(512);
        Err(ListingError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
