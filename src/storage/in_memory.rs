//! In-memory adapter for the `local` dialect and for test mode

use crate::core::error::{CrudError, CrudResult, StorageError};
use crate::storage::{Adapter, Document, Query, ensure_id, matches_query, merge_patch};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

/// Volatile adapter; documents live as long as the process
///
/// Uses RwLock for thread-safe access and keeps insertion order for `find`.
#[derive(Clone, Debug)]
pub struct MemoryAdapter {
    collection: String,
    docs: Arc<RwLock<IndexMap<String, Document>>>,
}

fn lock_error(e: impl std::fmt::Display) -> CrudError {
    CrudError::Internal(format!("Failed to acquire collection lock: {}", e))
}

impl MemoryAdapter {
    pub fn new(collection: impl Into<String>) -> Self {
        Self::with_documents(collection, IndexMap::new())
    }

    /// Start from pre-loaded documents, keyed by `_id`
    pub(crate) fn with_documents(
        collection: impl Into<String>,
        docs: IndexMap<String, Document>,
    ) -> Self {
        Self {
            collection: collection.into(),
            docs: Arc::new(RwLock::new(docs)),
        }
    }

    /// Copy of every document in insertion order
    pub(crate) fn snapshot(&self) -> CrudResult<Vec<Document>> {
        let docs = self.docs.read().map_err(lock_error)?;
        Ok(docs.values().cloned().collect())
    }

    /// Independent copy of the collection, keyed by `_id`
    pub(crate) fn detached(&self) -> CrudResult<Self> {
        let docs = self.docs.read().map_err(lock_error)?;
        Ok(Self::with_documents(self.collection.clone(), docs.clone()))
    }

    /// Replace every document with the contents of `other`
    pub(crate) fn replace_with(&self, other: &MemoryAdapter) -> CrudResult<()> {
        let incoming = other.docs.read().map_err(lock_error)?.clone();
        let mut docs = self.docs.write().map_err(lock_error)?;
        *docs = incoming;
        Ok(())
    }

    fn not_found(&self, id: &str) -> CrudError {
        StorageError::NotFound {
            collection: self.collection.clone(),
            id: id.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn count(&self, query: &Query) -> CrudResult<usize> {
        let docs = self.docs.read().map_err(lock_error)?;
        Ok(docs.values().filter(|d| matches_query(d, query)).count())
    }

    async fn find(&self, query: &Query) -> CrudResult<Vec<Document>> {
        let docs = self.docs.read().map_err(lock_error)?;
        Ok(docs
            .values()
            .filter(|d| matches_query(d, query))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> CrudResult<Option<Document>> {
        let docs = self.docs.read().map_err(lock_error)?;
        Ok(docs.get(id).cloned())
    }

    async fn insert(&self, mut doc: Document) -> CrudResult<Document> {
        let id = ensure_id(&mut doc);
        let mut docs = self.docs.write().map_err(lock_error)?;
        if docs.contains_key(&id) {
            return Err(StorageError::DuplicateKey {
                collection: self.collection.clone(),
                id,
            }
            .into());
        }
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update(&self, id: &str, patch: Document) -> CrudResult<Document> {
        let mut docs = self.docs.write().map_err(lock_error)?;
        let stored = docs.get_mut(id).ok_or_else(|| self.not_found(id))?;
        merge_patch(stored, patch);
        Ok(stored.clone())
    }

    async fn remove(&self, id: &str) -> CrudResult<Document> {
        let mut docs = self.docs.write().map_err(lock_error)?;
        docs.shift_remove(id).ok_or_else(|| self.not_found(id))
    }

    async fn clear(&self) -> CrudResult<usize> {
        let mut docs = self.docs.write().map_err(lock_error)?;
        let removed = docs.len();
        docs.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_get_returns_it() {
        let adapter = MemoryAdapter::new("users");
        let stored = adapter.insert(doc(json!({"login": "a"}))).await.unwrap();
        let id = stored["_id"].as_str().unwrap().to_string();

        let fetched = adapter.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched["login"], "a");
        assert_eq!(adapter.collection(), "users");
    }

    #[tokio::test]
    async fn test_find_keeps_insertion_order() {
        let adapter = MemoryAdapter::new("products");
        for name in ["c", "a", "b"] {
            adapter.insert(doc(json!({"name": name}))).await.unwrap();
        }
        let names: Vec<String> = adapter
            .find(&Query::new())
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let adapter = MemoryAdapter::new("roles");
        let err = adapter.update("nope", Document::new()).await.unwrap_err();
        assert!(matches!(
            err,
            CrudError::Storage(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let adapter = MemoryAdapter::new("roles");
        let clone = adapter.clone();
        clone.insert(doc(json!({"name": "x"}))).await.unwrap();
        assert_eq!(adapter.count(&Query::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_detached_copy_does_not_leak() {
        let adapter = MemoryAdapter::new("roles");
        adapter.insert(doc(json!({"_id": "a"}))).await.unwrap();

        let staged = adapter.detached().unwrap();
        staged.insert(doc(json!({"_id": "b"}))).await.unwrap();
        assert_eq!(adapter.count(&Query::new()).await.unwrap(), 1);

        adapter.replace_with(&staged).unwrap();
        assert_eq!(adapter.count(&Query::new()).await.unwrap(), 2);
    }
}
