mod file_config;

pub use file_config::{FileConfig, UpstreamConfig};

use crate::collections::SyncSettings;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SHOPIFY_API_VERSION: &str = "2025-01";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub request_timeout_sec: u64,
    pub shop_domain: Option<String>,
    pub shopify_api_version: String,
    pub upstream_timeout_sec: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            request_timeout_sec: 10,
            shop_domain: None,
            shopify_api_version: DEFAULT_SHOPIFY_API_VERSION.to_string(),
            upstream_timeout_sec: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub request_timeout_sec: u64,
    pub allow_empty_collections: bool,
    /// None when no shop is configured; `GET /products` is then unavailable.
    pub upstream: Option<UpstreamSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSettings {
    pub shop_domain: String,
    pub api_version: String,
    pub timeout_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }
        if db_path.is_dir() {
            bail!("db_path is a directory, expected a file: {:?}", db_path);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);
        if request_timeout_sec == 0 {
            bail!("request_timeout_sec must be greater than 0");
        }

        let allow_empty_collections = file.allow_empty_collections.unwrap_or(false);

        let upstream_file = file.upstream.unwrap_or_default();
        let upstream = upstream_file
            .shop_domain
            .or_else(|| cli.shop_domain.clone())
            .filter(|shop| !shop.trim().is_empty())
            .map(|shop_domain| UpstreamSettings {
                shop_domain,
                api_version: upstream_file
                    .api_version
                    .unwrap_or_else(|| cli.shopify_api_version.clone()),
                timeout_sec: upstream_file.timeout_sec.unwrap_or(cli.upstream_timeout_sec),
            });

        Ok(Self {
            db_path,
            port,
            metrics_port,
            logging_level,
            request_timeout_sec,
            allow_empty_collections,
            upstream,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            request_timeout: self.request_timeout(),
            allow_empty_collections: self.allow_empty_collections,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
