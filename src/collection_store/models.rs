use serde::{Deserialize, Serialize};
use std::fmt;

/// Display priority of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Parses a priority name, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locally cached reference to an upstream catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub created_at: i64,
}

/// A named, prioritized grouping of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub priority: Priority,
    pub created_at: i64,
    pub products: Vec<Product>,
}

/// Product data supplied by a client, inserted only if the id is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub id: String,
    pub title: String,
    pub image_url: String,
}

/// A validated collection ready to be written.
///
/// `products` holds no duplicate ids; their order is the display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    pub name: String,
    pub priority: Priority,
    pub products: Vec<ProductRef>,
}

/// Result of a successful collection write.
#[derive(Debug, Clone)]
pub struct CreatedCollection {
    pub collection: Collection,
    /// How many of the referenced products did not exist before this write.
    pub inserted_products: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parse_ignores_case() {
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
        assert_eq!(Priority::parse(" medium "), Some(Priority::Medium));
        assert_eq!(Priority::parse("Low"), Some(Priority::Low));
        assert_eq!(Priority::parse("urgent"), None);
        assert_eq!(Priority::parse(""), None);
    }

    #[test]
    fn collection_serializes_camel_case() {
        let collection = Collection {
            id: "c1".to_string(),
            name: "Favorites".to_string(),
            priority: Priority::Medium,
            created_at: 10,
            products: vec![Product {
                id: "p1".to_string(),
                title: "Shoe".to_string(),
                image_url: "".to_string(),
                created_at: 10,
            }],
        };

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["priority"], "Medium");
        assert_eq!(json["createdAt"], 10);
        assert_eq!(json["products"][0]["imageUrl"], "");
    }
}
