//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own SQLite database in a
//! temporary directory.

use super::constants::*;
use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use collections_server::collection_store::{CollectionStore, SqliteCollectionStore};
use collections_server::collections::SyncSettings;
use collections_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use collections_server::upstream::{ProductCatalog, ShopifyProductCatalog};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Spawns `app` on a random local port, returning its port and a shutdown sender.
async fn serve_on_random_port(app: Router) -> (u16, tokio::sync::oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");

    let port = listener
        .local_addr()
        .expect("Failed to get local address")
        .port();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
    });

    (port, shutdown_tx)
}

/// Stand-in for the upstream commerce platform's product listing.
///
/// Answers `GET /admin/api/{version}/products.json` with two products when
/// the access token matches [`VALID_ACCESS_TOKEN`], 401 otherwise.
pub struct MockUpstream {
    pub base_url: String,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

async fn mock_products(headers: HeaderMap) -> impl IntoResponse {
    let token = headers
        .get("X-Shopify-Access-Token")
        .and_then(|v| v.to_str().ok());
    if token != Some(VALID_ACCESS_TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"errors": "Invalid API key or access token"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "products": [
                {"id": 101, "title": "Red Shoe", "image": {"src": "https://cdn.example.com/red.png"}},
                {"id": 102, "title": "Blue Hat", "image": null}
            ]
        })),
    )
}

impl MockUpstream {
    pub async fn spawn() -> Self {
        let app = Router::new().route(
            &format!("/admin/api/{}/products.json", TEST_API_VERSION),
            get(mock_products),
        );
        let (port, shutdown_tx) = serve_on_random_port(app).await;
        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            _shutdown_tx: Some(shutdown_tx),
        }
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Store for direct database access in tests
    pub store: Arc<dyn CollectionStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port, without an upstream catalog
    pub async fn spawn() -> Self {
        Self::spawn_with(SyncSettings::default(), None).await
    }

    /// Spawns a test server whose `GET /products` proxies to `upstream`
    pub async fn spawn_with_upstream(upstream: &MockUpstream) -> Self {
        let catalog = ShopifyProductCatalog::new(&upstream.base_url, TEST_API_VERSION, 5)
            .expect("Failed to create product catalog");
        Self::spawn_with(SyncSettings::default(), Some(Arc::new(catalog))).await
    }

    pub async fn spawn_with(
        settings: SyncSettings,
        product_catalog: Option<Arc<dyn ProductCatalog>>,
    ) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let store: Arc<dyn CollectionStore> = Arc::new(
            SqliteCollectionStore::new(temp_db_dir.path().join("collections.db"))
                .expect("Failed to open collection store"),
        );

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };

        let app = make_app(config, store.clone(), settings, product_catalog)
            .expect("Failed to build app");

        let (port, shutdown_tx) = serve_on_random_port(app).await;

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            port,
            store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling `GET /`
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
