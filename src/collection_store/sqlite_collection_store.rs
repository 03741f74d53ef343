use super::models::{Collection, CreatedCollection, NewCollection, Priority, Product};
use super::schema::COLLECTION_VERSIONED_SCHEMAS;
use super::{CollectionStore, DeadlineExceeded};
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

const SELECT_COLLECTIONS_WITH_PRODUCTS: &str = "
    SELECT c.id, c.name, c.priority, c.created_at,
           p.id, p.title, p.image_url, p.created_at
    FROM collections c
    LEFT JOIN collection_products cp ON cp.collection_id = c.id
    LEFT JOIN products p ON p.id = cp.product_id
    WHERE (?1 IS NULL OR c.id = ?1)
    ORDER BY c.rowid ASC, cp.position ASC";

/// One row of the collections/products join.
struct JoinedRow {
    collection_id: String,
    name: String,
    priority: String,
    created_at: i64,
    product: Option<Product>,
}

#[derive(Clone)]
pub struct SqliteCollectionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCollectionStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        info!("Opening collections database at {:?}", path);
        let conn = open_versioned_db(path, COLLECTION_VERSIONED_SCHEMAS)
            .context("Failed to open collections database")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Collections database lock poisoned"))
    }

    fn row_to_product(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get(offset)?,
            title: row.get(offset + 1)?,
            image_url: row.get(offset + 2)?,
            created_at: row.get(offset + 3)?,
        })
    }

    fn load_collections(conn: &Connection, only_id: Option<&str>) -> Result<Vec<Collection>> {
        let mut stmt = conn.prepare_cached(SELECT_COLLECTIONS_WITH_PRODUCTS)?;
        let rows = stmt
            .query_map(params![only_id], |row| {
                let product_id: Option<String> = row.get(4)?;
                Ok(JoinedRow {
                    collection_id: row.get(0)?,
                    name: row.get(1)?,
                    priority: row.get(2)?,
                    created_at: row.get(3)?,
                    product: match product_id {
                        Some(_) => Some(Self::row_to_product(row, 4)?),
                        None => None,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut collections: Vec<Collection> = Vec::new();
        for row in rows {
            let is_same = collections
                .last()
                .is_some_and(|c| c.id == row.collection_id);
            if !is_same {
                let priority = Priority::parse(&row.priority).with_context(|| {
                    format!(
                        "Collection {} has unknown priority {:?}",
                        row.collection_id, row.priority
                    )
                })?;
                collections.push(Collection {
                    id: row.collection_id,
                    name: row.name,
                    priority,
                    created_at: row.created_at,
                    products: Vec::new(),
                });
            }
            if let (Some(product), Some(collection)) = (row.product, collections.last_mut()) {
                collection.products.push(product);
            }
        }
        Ok(collections)
    }
}

impl CollectionStore for SqliteCollectionStore {
    fn create_collection(
        &self,
        new_collection: &NewCollection,
        deadline: Option<Instant>,
    ) -> Result<CreatedCollection> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut inserted_products = 0;
        {
            let mut insert_product = tx.prepare_cached(
                "INSERT OR IGNORE INTO products (id, title, image_url) VALUES (?1, ?2, ?3)",
            )?;
            for product in &new_collection.products {
                inserted_products += insert_product
                    .execute(params![product.id, product.title, product.image_url])
                    .with_context(|| format!("Failed to upsert product {}", product.id))?;
            }
        }

        let collection_id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO collections (id, name, priority) VALUES (?1, ?2, ?3)",
            params![
                collection_id,
                new_collection.name,
                new_collection.priority.as_str()
            ],
        )
        .context("Failed to insert collection")?;

        {
            let mut insert_link = tx.prepare_cached(
                "INSERT INTO collection_products (collection_id, product_id, position)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (position, product) in new_collection.products.iter().enumerate() {
                insert_link
                    .execute(params![collection_id, product.id, position as i64])
                    .with_context(|| format!("Failed to link product {}", product.id))?;
            }
        }

        let collection = Self::load_collections(&tx, Some(&collection_id))?
            .pop()
            .context("Created collection not readable inside its transaction")?;

        if deadline.is_some_and(|d| Instant::now() >= d) {
            // Dropping the transaction rolls it back
            return Err(DeadlineExceeded.into());
        }
        tx.commit().context("Failed to commit collection")?;

        debug!(
            "Created collection {} with {} products ({} new)",
            collection.id,
            collection.products.len(),
            inserted_products
        );
        Ok(CreatedCollection {
            collection,
            inserted_products,
        })
    }

    fn delete_collection(&self, id: &str, deadline: Option<Instant>) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM collection_products WHERE collection_id = ?1",
            params![id],
        )?;
        let deleted = tx.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(DeadlineExceeded.into());
        }
        tx.commit().context("Failed to commit collection deletion")?;
        Ok(deleted > 0)
    }

    fn list_collections(&self) -> Result<Vec<Collection>> {
        let conn = self.conn()?;
        Self::load_collections(&conn, None)
    }

    fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let conn = self.conn()?;
        let product = conn
            .query_row(
                "SELECT id, title, image_url, created_at FROM products WHERE id = ?1",
                params![id],
                |row| Self::row_to_product(row, 0),
            )
            .optional()?;
        Ok(product)
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, title, image_url, created_at FROM products ORDER BY rowid ASC")?;
        let products = stmt
            .query_map([], |row| Self::row_to_product(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    fn count_collections(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM collections", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
