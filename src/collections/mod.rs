//! Collection lifecycle: validation, product reconciliation, create, delete
//! and listing on top of a [`CollectionStore`](crate::collection_store::CollectionStore).

mod error;
mod filter;
mod query;
mod request;
mod synchronizer;

pub use error::CollectionError;
pub use filter::CollectionFilter;
pub use query::CollectionQueryService;
pub use request::{CreateCollectionRequest, DeleteCollectionRequest};
pub use synchronizer::{CollectionSynchronizer, SyncSettings};

use anyhow::anyhow;
use std::time::Duration;

/// Runs blocking store work off the async runtime, bounded by `timeout`.
async fn run_blocking<T, F>(
    operation: &'static str,
    timeout: Duration,
    work: F,
) -> Result<T, CollectionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CollectionError> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(CollectionError::Internal(anyhow!(
            "{} task failed: {}",
            operation,
            join_error
        ))),
        Err(_) => Err(CollectionError::Timeout(timeout)),
    }
}
