//! HTTP client for the Shopify Admin REST API.

use super::ProductCatalog;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

pub struct ShopifyProductCatalog {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl ShopifyProductCatalog {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `shop` - Shop domain (e.g. "my-shop.myshopify.com"), or a full base URL
    ///   including the scheme
    /// * `api_version` - Admin API version (e.g. "2025-01")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(shop: &str, api_version: &str, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let shop = shop.trim_end_matches('/');
        let base_url = if shop.starts_with("http://") || shop.starts_with("https://") {
            shop.to_string()
        } else {
            format!("https://{}", shop)
        };

        Ok(Self {
            client,
            base_url,
            api_version: api_version.to_string(),
        })
    }

    pub fn products_url(&self) -> String {
        format!(
            "{}/admin/api/{}/products.json",
            self.base_url, self.api_version
        )
    }
}

#[async_trait]
impl ProductCatalog for ShopifyProductCatalog {
    async fn list_products(&self, access_token: &str) -> Result<serde_json::Value> {
        let url = self.products_url();
        debug!("Fetching upstream products from {}", url);
        let response = self
            .client
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .context("Failed to connect to product catalog")?;

        let status = response.status();
        if !status.is_success() {
            bail!(
                "Error fetching products: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            );
        }

        response
            .json()
            .await
            .context("Failed to parse products response")
    }
}
