use crate::collection_store::Collection;

/// Name search plus priority filter over an already loaded collection list.
///
/// An empty term means no restriction on that dimension. Both restrictions
/// must hold for a collection to be kept.
#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    pub search: String,
    pub priority: String,
}

impl CollectionFilter {
    pub fn new(search: impl Into<String>, priority: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            priority: priority.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.priority.is_empty()
    }

    pub fn matches(&self, collection: &Collection) -> bool {
        if !self.search.is_empty()
            && !collection
                .name
                .to_lowercase()
                .contains(&self.search.to_lowercase())
        {
            return false;
        }
        if !self.priority.is_empty()
            && collection.priority.as_str().to_lowercase() != self.priority.to_lowercase()
        {
            return false;
        }
        true
    }
}
