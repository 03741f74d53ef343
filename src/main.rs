use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use collections_server::collection_store::SqliteCollectionStore;
use collections_server::collections::CollectionQueryService;
use collections_server::config::{AppConfig, CliConfig, FileConfig, DEFAULT_SHOPIFY_API_VERSION};
use collections_server::server::{self, metrics, run_server, RequestsLoggingLevel, ServerConfig};
use collections_server::upstream::{ProductCatalog, ShopifyProductCatalog};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values present in the file override CLI flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file holding products and collections.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Upper bound in seconds for a single collection operation.
    #[clap(long, default_value_t = 10)]
    pub request_timeout_sec: u64,

    /// Shop domain used for the upstream product listing, e.g. my-shop.myshopify.com.
    #[clap(long)]
    pub shop_domain: Option<String>,

    /// Admin API version of the upstream product listing.
    #[clap(long, default_value = DEFAULT_SHOPIFY_API_VERSION)]
    pub shopify_api_version: String,

    /// Timeout in seconds for upstream requests.
    #[clap(long, default_value_t = 30)]
    pub upstream_timeout_sec: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            request_timeout_sec: self.request_timeout_sec,
            shop_domain: self.shop_domain.clone(),
            shopify_api_version: self.shopify_api_version.clone(),
            upstream_timeout_sec: self.upstream_timeout_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening SQLite database at {:?}...", config.db_path);
    let store = Arc::new(SqliteCollectionStore::new(&config.db_path)?);

    info!("Initializing metrics...");
    metrics::init_metrics();
    let query = CollectionQueryService::new(store.clone(), config.request_timeout());
    metrics::set_collections_count(query.count().await?);

    let product_catalog: Option<Arc<dyn ProductCatalog>> = match &config.upstream {
        Some(upstream) => {
            info!(
                "Product catalog configured for {} (API {})",
                upstream.shop_domain, upstream.api_version
            );
            Some(Arc::new(ShopifyProductCatalog::new(
                &upstream.shop_domain,
                &upstream.api_version,
                upstream.timeout_sec,
            )?))
        }
        None => {
            warn!("No shop domain configured, GET /products will be unavailable");
            None
        }
    };

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        metrics_port: config.metrics_port,
    };

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(
        server_config,
        store.clone(),
        config.sync_settings(),
        product_catalog,
        server::shutdown_signal(),
    )
    .await?;

    drop(store);
    info!("Database closed");
    Ok(())
}
