use axum::extract::FromRef;

use crate::collections::{CollectionQueryService, CollectionSynchronizer};
use crate::upstream::ProductCatalog;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSynchronizer = Arc<CollectionSynchronizer>;
pub type GuardedQueryService = Arc<CollectionQueryService>;
pub type OptionalProductCatalog = Option<Arc<dyn ProductCatalog>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub synchronizer: GuardedSynchronizer,
    pub queries: GuardedQueryService,
    pub product_catalog: OptionalProductCatalog,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedSynchronizer {
    fn from_ref(input: &ServerState) -> Self {
        input.synchronizer.clone()
    }
}

impl FromRef<ServerState> for GuardedQueryService {
    fn from_ref(input: &ServerState) -> Self {
        input.queries.clone()
    }
}

impl FromRef<ServerState> for OptionalProductCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.product_catalog.clone()
    }
}
