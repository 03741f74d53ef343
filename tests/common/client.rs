//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per endpoint. When API routes or request
//! formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// GET /collections
    pub async fn list_collections(&self) -> Response {
        self.client
            .get(self.url("/collections"))
            .send()
            .await
            .expect("List collections request failed")
    }

    /// POST /collections with an arbitrary JSON body
    pub async fn create_collection_raw(&self, body: Value) -> Response {
        self.client
            .post(self.url("/collections"))
            .json(&body)
            .send()
            .await
            .expect("Create collection request failed")
    }

    /// POST /collections with `products` given as `(id, title)` pairs
    pub async fn create_collection(
        &self,
        name: &str,
        priority: &str,
        products: &[(&str, &str)],
    ) -> Response {
        let products: Vec<Value> = products
            .iter()
            .map(|(id, title)| json!({"id": id, "title": title}))
            .collect();
        self.create_collection_raw(json!({
            "name": name,
            "priority": priority,
            "products": products,
        }))
        .await
    }

    /// DELETE /collections with `{id}`
    pub async fn delete_collection(&self, id: &str) -> Response {
        self.delete_collection_raw(json!({ "id": id })).await
    }

    /// DELETE /collections with an arbitrary JSON body
    pub async fn delete_collection_raw(&self, body: Value) -> Response {
        self.client
            .delete(self.url("/collections"))
            .json(&body)
            .send()
            .await
            .expect("Delete collection request failed")
    }

    // ========================================================================
    // Products
    // ========================================================================

    /// GET /products, with the access token header when given
    pub async fn list_products(&self, access_token: Option<&str>) -> Response {
        let mut request = self.client.get(self.url("/products"));
        if let Some(token) = access_token {
            request = request.header("X-Shopify-Access-Token", token);
        }
        request.send().await.expect("List products request failed")
    }

    // ========================================================================
    // Misc
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Home request failed")
    }
}
