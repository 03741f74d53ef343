//! Client request bodies and their validation.
//!
//! Fields are kept as raw JSON values so that a wrong type is reported as a
//! validation error with a useful message instead of a generic decode failure.

use super::CollectionError;
use crate::collection_store::{NewCollection, Priority, ProductRef};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Default, Deserialize)]
pub struct CreateCollectionRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub priority: Option<Value>,
    #[serde(default)]
    pub products: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteCollectionRequest {
    #[serde(default)]
    pub id: Option<Value>,
}

/// Upstream ids are numeric in some payloads, accept them as strings.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_product_ref(index: usize, value: &Value) -> Result<ProductRef, CollectionError> {
    let entry = value
        .as_object()
        .ok_or_else(|| CollectionError::validation(format!("products[{}] must be an object", index)))?;

    let id = entry
        .get("id")
        .and_then(id_string)
        .ok_or_else(|| CollectionError::validation(format!("products[{}].id is required", index)))?;

    let title = match entry.get("title") {
        Some(Value::String(title)) => title.clone(),
        _ => {
            return Err(CollectionError::validation(format!(
                "products[{}].title is required",
                index
            )))
        }
    };

    let image_url = match entry.get("imageUrl") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(url)) => url.clone(),
        Some(_) => {
            return Err(CollectionError::validation(format!(
                "products[{}].imageUrl must be a string",
                index
            )))
        }
    };

    Ok(ProductRef {
        id,
        title,
        image_url,
    })
}

impl CreateCollectionRequest {
    /// Checks every field and normalizes the product list.
    ///
    /// Repeated product ids collapse onto their first occurrence, keeping order.
    pub fn validate(self, allow_empty_products: bool) -> Result<NewCollection, CollectionError> {
        let name = match &self.name {
            Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
            _ => return Err(CollectionError::validation("name is required")),
        };

        let priority = match &self.priority {
            Some(Value::String(raw)) => Priority::parse(raw).ok_or_else(|| {
                CollectionError::validation(format!(
                    "priority must be one of High, Medium, Low (got {:?})",
                    raw
                ))
            })?,
            _ => return Err(CollectionError::validation("priority is required")),
        };

        let entries = match &self.products {
            Some(Value::Array(entries)) => entries,
            _ => return Err(CollectionError::validation("products must be a list")),
        };
        if entries.is_empty() && !allow_empty_products {
            return Err(CollectionError::validation("products must not be empty"));
        }

        let mut seen = HashSet::with_capacity(entries.len());
        let mut products = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let product = parse_product_ref(index, entry)?;
            if seen.insert(product.id.clone()) {
                products.push(product);
            }
        }

        Ok(NewCollection {
            name,
            priority,
            products,
        })
    }
}

impl DeleteCollectionRequest {
    pub fn validate(self) -> Result<String, CollectionError> {
        self.id
            .as_ref()
            .and_then(id_string)
            .ok_or_else(|| CollectionError::Validation("Collection ID is required".to_string()))
    }
}
