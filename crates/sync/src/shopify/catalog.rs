//! Thin catalog collaborator for queued create/delete listing work.
//!
//! Catalog management (titles, grading metadata, tagging, images) lives in
//! the intake service, not here. The sync queue only needs to be able to
//! replay a `create` or `delete` against the platform, so this seam carries
//! exactly those two calls.

use serde_json::json;
use tracing::instrument;

use slabworks_core::ProductId;

use super::{ShopifyClient, ShopifyError};

/// Create/delete operations the queue processor can replay.
pub trait CatalogOps {
    /// Create a product listing from a prepared payload.
    fn create_listing(
        &self,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<(), ShopifyError>>;

    /// Delete a product listing.
    fn delete_listing(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), ShopifyError>>;
}

impl CatalogOps for ShopifyClient {
    /// # Errors
    ///
    /// Returns an error if the API request fails after retries.
    #[instrument(skip(self, payload))]
    async fn create_listing(&self, payload: &serde_json::Value) -> Result<(), ShopifyError> {
        let url = self.admin_url("products.json");
        let body = json!({ "product": payload });
        self.send_raw(|client| client.post(&url).json(&body)).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails after retries.
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn delete_listing(&self, product_id: ProductId) -> Result<(), ShopifyError> {
        let url = self.admin_url(&format!("products/{product_id}.json"));
        self.send_raw(|client| client.delete(&url)).await?;
        Ok(())
    }
}
