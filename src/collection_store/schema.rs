//! SQLite schema for cached products, collections and their membership links.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

// =============================================================================
// Version 1
// =============================================================================

/// Products are keyed by their upstream id and never deleted by this service.
const PRODUCTS_TABLE_V1: Table = Table {
    name: "products",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "image_url",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const COLLECTIONS_TABLE_V1: Table = Table {
    name: "collections",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("priority", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_collections_priority", "priority")],
    unique_constraints: &[],
};

/// Membership links. Removing a collection drops its links, while a product
/// that is still linked somewhere cannot be removed.
const COLLECTION_PRODUCTS_TABLE_V1: Table = Table {
    name: "collection_products",
    columns: &[
        sqlite_column!(
            "collection_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "collections",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "product_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "products",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Restrict,
            })
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_collection_products_product", "product_id")],
    unique_constraints: &[&["collection_id", "product_id"]],
};

pub const COLLECTION_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        PRODUCTS_TABLE_V1,
        COLLECTIONS_TABLE_V1,
        COLLECTION_PRODUCTS_TABLE_V1,
    ],
    migration: None,
}];
