use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use super::collection_routes::make_collection_routes;
use super::metrics::metrics_handler;
use super::product_routes::make_product_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::collection_store::CollectionStore;
use crate::collections::{CollectionQueryService, CollectionSynchronizer, SyncSettings};
use crate::upstream::ProductCatalog;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    })
}

impl ServerState {
    fn new(
        config: ServerConfig,
        store: Arc<dyn CollectionStore>,
        sync_settings: SyncSettings,
        product_catalog: OptionalProductCatalog,
    ) -> ServerState {
        let queries = CollectionQueryService::new(store.clone(), sync_settings.request_timeout);
        ServerState {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_owned(),
            synchronizer: Arc::new(CollectionSynchronizer::new(store, sync_settings)),
            queries: Arc::new(queries),
            product_catalog,
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    store: Arc<dyn CollectionStore>,
    sync_settings: SyncSettings,
    product_catalog: Option<Arc<dyn ProductCatalog>>,
) -> Result<Router> {
    let state = ServerState::new(config, store, sync_settings, product_catalog);

    let app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .merge(make_collection_routes(state.clone()))
        .merge(make_product_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down..."),
        () = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

pub async fn run_server<S>(
    config: ServerConfig,
    store: Arc<dyn CollectionStore>,
    sync_settings: SyncSettings,
    product_catalog: Option<Arc<dyn ProductCatalog>>,
    shutdown: S,
) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, store, sync_settings, product_catalog)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    let metrics_server = tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server failed: {}", err);
        }
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    metrics_server.abort();
    info!("Server stopped");
    Ok(result?)
}
