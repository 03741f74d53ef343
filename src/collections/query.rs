use super::{run_blocking, CollectionError, CollectionFilter};
use crate::collection_store::{Collection, CollectionStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Read side: collections with their products eagerly loaded.
#[derive(Clone)]
pub struct CollectionQueryService {
    store: Arc<dyn CollectionStore>,
    timeout: Duration,
}

impl CollectionQueryService {
    pub fn new(store: Arc<dyn CollectionStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Every collection in creation order.
    pub async fn list(&self) -> Result<Vec<Collection>, CollectionError> {
        let store = self.store.clone();
        let result = run_blocking("list_collections", self.timeout, move || {
            store.list_collections().map_err(CollectionError::Internal)
        })
        .await;

        match &result {
            Ok(collections) => debug!("Listed {} collections", collections.len()),
            Err(err) => error!("Failed to list collections: {}", err),
        }
        result
    }

    /// Same as [`list`](Self::list), narrowed down by `filter`.
    pub async fn list_filtered(
        &self,
        filter: &CollectionFilter,
    ) -> Result<Vec<Collection>, CollectionError> {
        let collections = self.list().await?;
        if filter.is_empty() {
            return Ok(collections);
        }
        Ok(collections.into_iter().filter(|c| filter.matches(c)).collect())
    }

    pub async fn count(&self) -> Result<usize, CollectionError> {
        let store = self.store.clone();
        run_blocking("count_collections", self.timeout, move || {
            store.count_collections().map_err(CollectionError::Internal)
        })
        .await
    }
}
