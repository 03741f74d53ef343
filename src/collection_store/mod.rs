//! Durable storage for cached products and the collections that group them.

mod models;
mod schema;
mod sqlite_collection_store;

pub use models::*;
pub use schema::COLLECTION_VERSIONED_SCHEMAS;
pub use sqlite_collection_store::SqliteCollectionStore;

use anyhow::Result;
use std::time::Instant;
use thiserror::Error;

/// Returned (inside `anyhow::Error`) when a write reached its commit point
/// after the caller's deadline. The write has been rolled back.
#[derive(Debug, Error)]
#[error("deadline exceeded before commit, write rolled back")]
pub struct DeadlineExceeded;

pub trait CollectionStore: Send + Sync {
    /// Upserts every referenced product (existing rows are left untouched),
    /// then creates the collection linked to all of them, in one transaction.
    ///
    /// If `deadline` has passed when the transaction is about to commit, it is
    /// rolled back and a [`DeadlineExceeded`] error is returned.
    fn create_collection(
        &self,
        new_collection: &NewCollection,
        deadline: Option<Instant>,
    ) -> Result<CreatedCollection>;

    /// Removes a collection and its membership links. Products are kept.
    ///
    /// Returns false if no collection with that id exists. Like
    /// [`create_collection`](Self::create_collection), a passed `deadline`
    /// rolls the deletion back with [`DeadlineExceeded`].
    fn delete_collection(&self, id: &str, deadline: Option<Instant>) -> Result<bool>;

    /// All collections in creation order, each with its products loaded.
    fn list_collections(&self) -> Result<Vec<Collection>>;


    fn get_product(&self, id: &str) -> Result<Option<Product>>;

    fn list_products(&self) -> Result<Vec<Product>>;

    fn count_collections(&self) -> Result<usize>;
}
