use super::{run_blocking, CollectionError, CreateCollectionRequest, DeleteCollectionRequest};
use crate::collection_store::{Collection, CollectionStore, DeadlineExceeded};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Slack past the deadline for the store to notice it and roll back.
const COMMIT_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Upper bound for a single create/delete, including waiting for the store.
    pub request_timeout: Duration,
    /// Whether a collection may be created without any product.
    pub allow_empty_collections: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            request_timeout: Duration::from_secs(10),
            allow_empty_collections: false,
        }
    }
}

/// Creates and deletes collections, making sure every linked product exists
/// in the local store first.
#[derive(Clone)]
pub struct CollectionSynchronizer {
    store: Arc<dyn CollectionStore>,
    settings: SyncSettings,
}

impl CollectionSynchronizer {
    pub fn new(store: Arc<dyn CollectionStore>, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    /// Validates the request, upserts the referenced products and creates the
    /// collection linked to them. Either everything is written or nothing is.
    pub async fn create(
        &self,
        request: CreateCollectionRequest,
    ) -> Result<Collection, CollectionError> {
        let new_collection = match request.validate(self.settings.allow_empty_collections) {
            Ok(new_collection) => new_collection,
            Err(err) => {
                warn!("Rejected collection creation: {}", err);
                return Err(err);
            }
        };

        let timeout = self.settings.request_timeout;
        let deadline = Instant::now() + timeout;
        let store = self.store.clone();
        let name = new_collection.name.clone();
        let product_count = new_collection.products.len();

        let result = run_blocking("create_collection", timeout + COMMIT_GRACE, move || {
            store
                .create_collection(&new_collection, Some(deadline))
                .map_err(|err| {
                    if err.is::<DeadlineExceeded>() {
                        CollectionError::Timeout(timeout)
                    } else {
                        CollectionError::Internal(err)
                    }
                })
        })
        .await;

        match result {
            Ok(created) => {
                info!(
                    "Created collection {} ({:?}, {}) with {} products, {} newly cached",
                    created.collection.id,
                    created.collection.name,
                    created.collection.priority,
                    product_count,
                    created.inserted_products
                );
                Ok(created.collection)
            }
            Err(err) => {
                error!("Failed to create collection {:?}: {}", name, err);
                Err(err)
            }
        }
    }

    /// Deletes a collection and its membership links, leaving products intact.
    pub async fn delete(&self, request: DeleteCollectionRequest) -> Result<String, CollectionError> {
        let id = match request.validate() {
            Ok(id) => id,
            Err(err) => {
                warn!("Rejected collection deletion: {}", err);
                return Err(err);
            }
        };

        let timeout = self.settings.request_timeout;
        let deadline = Instant::now() + timeout;
        let store = self.store.clone();
        let target = id.clone();
        let result = run_blocking("delete_collection", timeout + COMMIT_GRACE, move || {
            match store.delete_collection(&target, Some(deadline)) {
                Ok(true) => Ok(()),
                Ok(false) => Err(CollectionError::NotFound("Collection not found".to_string())),
                Err(err) if err.is::<DeadlineExceeded>() => Err(CollectionError::Timeout(timeout)),
                Err(err) => Err(CollectionError::Internal(err)),
            }
        })
        .await;

        match result {
            Ok(()) => {
                info!("Deleted collection {}", id);
                Ok(id)
            }
            Err(err @ CollectionError::NotFound(_)) => {
                warn!("Cannot delete collection {}: not found", id);
                Err(err)
            }
            Err(err) => {
                error!("Failed to delete collection {}: {}", id, err);
                Err(err)
            }
        }
    }
}
