//! Read-only access to the upstream commerce platform's product listing.

mod client;

pub use client::{ShopifyProductCatalog, ACCESS_TOKEN_HEADER};

use anyhow::Result;
use async_trait::async_trait;

/// Source of raw product listings, queried with a per-request credential.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the upstream listing body unchanged (`{"products": [...]}`).
    async fn list_products(&self, access_token: &str) -> Result<serde_json::Value>;
}
