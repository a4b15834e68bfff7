//! Search documents produced by the transformer.

use serde_json::{Map, Value};

/// A document routed to a search index.
///
/// `(index, id)` is the upsert key: writing the same document twice leaves
/// the index unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDocument {
    /// Target index name.
    pub index: String,
    /// Document identifier within the index.
    pub id: String,
    /// Document body.
    pub source: Map<String, Value>,
}

impl SearchDocument {
    /// Create a routed document.
    pub fn new(index: impl Into<String>, id: impl Into<String>, source: Map<String, Value>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            source,
        }
    }

    /// Look up a body field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.source.get(name)
    }
}
