//! End-to-end tests for `GET /products`

mod common;

use common::{MockUpstream, TestClient, TestServer, VALID_ACCESS_TOKEN};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_products_passes_upstream_listing_through() {
    let upstream = MockUpstream::spawn().await;
    let server = TestServer::spawn_with_upstream(&upstream).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_products(Some(VALID_ACCESS_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["title"], "Red Shoe");
}

#[tokio::test]
async fn test_products_without_token_is_401() {
    let upstream = MockUpstream::spawn().await;
    let server = TestServer::spawn_with_upstream(&upstream).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_products(None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_products_upstream_rejection_is_500() {
    let upstream = MockUpstream::spawn().await;
    let server = TestServer::spawn_with_upstream(&upstream).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_products(Some("wrong-token")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Error fetching products: Unauthorized");
}

#[tokio::test]
async fn test_products_without_shop_is_503() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_products(Some(VALID_ACCESS_TOKEN)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
