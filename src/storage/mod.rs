//! Storage adapters for the supported dialects
//!
//! Every adapter stores JSON documents in one collection, keyed by a string
//! `_id`. Adapters assign a UUID `_id` on insert when the document has none.
//! The [`selector`] module maps a configured [`Dialect`](crate::config::Dialect)
//! to one of them.

pub mod file;
pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;
pub mod selector;

use crate::core::error::CrudResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

pub use file::FileAdapter;
pub use in_memory::MemoryAdapter;
#[cfg(feature = "mongodb_backend")]
pub use mongodb::MongoAdapter;
pub use selector::select_adapter;

/// Stored document
pub type Document = Map<String, Value>;

/// Equality filter; an empty query matches every document
pub type Query = Map<String, Value>;

/// Identifier key inside stored documents
pub const ID_KEY: &str = "_id";

/// Storage adapter contract
///
/// Adapters are owned by a single service mixin and never shared.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Short backend name for logs ("memory", "file", "mongodb")
    fn backend(&self) -> &'static str;

    /// Collection this adapter is bound to
    fn collection(&self) -> &str;

    async fn count(&self, query: &Query) -> CrudResult<usize>;

    async fn find(&self, query: &Query) -> CrudResult<Vec<Document>>;

    async fn find_one(&self, query: &Query) -> CrudResult<Option<Document>> {
        Ok(self.find(query).await?.into_iter().next())
    }

    async fn get(&self, id: &str) -> CrudResult<Option<Document>>;

    /// Insert a document, assigning `_id` when absent; returns the stored form
    async fn insert(&self, doc: Document) -> CrudResult<Document>;

    /// Shallow-merge `patch` into the stored document
    ///
    /// Non-null values are set (`$set`); a null value removes the key
    /// (`$unset`).
    async fn update(&self, id: &str, patch: Document) -> CrudResult<Document>;

    /// Remove a document, returning it
    async fn remove(&self, id: &str) -> CrudResult<Document>;

    /// Remove every document, returning how many were removed
    async fn clear(&self) -> CrudResult<usize>;
}

/// Ensure the document has a string `_id`, returning it
pub fn ensure_id(doc: &mut Document) -> String {
    match doc.get(ID_KEY) {
        Some(Value::String(id)) => id.clone(),
        Some(other) if !other.is_null() => {
            let id = match other {
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            doc.insert(ID_KEY.to_string(), Value::String(id.clone()));
            id
        }
        _ => {
            let id = Uuid::new_v4().to_string();
            doc.insert(ID_KEY.to_string(), Value::String(id.clone()));
            id
        }
    }
}

/// True when every query key equals the document value
///
/// An array field matches a scalar query value it contains.
pub fn matches_query(doc: &Document, query: &Query) -> bool {
    query.iter().all(|(key, expected)| match doc.get(key) {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(actual) => values_equal(actual, expected),
        None => expected.is_null(),
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Merge `patch` over `target`, never touching `_id`
///
/// A null patch value removes the key.
pub fn merge_patch(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        if key == ID_KEY {
            continue;
        }
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}
