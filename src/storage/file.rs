//! File-backed adapter for the `file` dialect
//!
//! The collection is held in memory and rewritten to disk as JSON lines
//! (one document per line) after every mutation. The file is read once when
//! the adapter is opened.

use crate::core::error::{CrudResult, StorageError};
use crate::storage::{Adapter, Document, ID_KEY, MemoryAdapter, Query};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Extension of collection files
pub const FILE_EXTENSION: &str = "db";

/// Deterministic file name for a collection: `<dbname>_<collection>.db`
pub fn collection_file_name(db_name: &str, collection: &str) -> String {
    format!("{}_{}.{}", db_name, collection, FILE_EXTENSION)
}

/// Adapter persisting one collection to a local file
#[derive(Debug)]
pub struct FileAdapter {
    path: PathBuf,
    store: MemoryAdapter,
    write_lock: Mutex<()>,
}

fn io_error(path: &Path, e: impl std::fmt::Display) -> StorageError {
    StorageError::IoError {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

impl FileAdapter {
    /// Open (or create on first write) the collection file at `path`
    pub fn open(path: impl Into<PathBuf>, collection: impl Into<String>) -> CrudResult<Self> {
        let path = path.into();
        let docs = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
            parse_lines(&path, &content)?
        } else {
            IndexMap::new()
        };

        tracing::debug!(
            path = %path.display(),
            count = docs.len(),
            "Opened file collection"
        );

        Ok(Self {
            path,
            store: MemoryAdapter::with_documents(collection, docs),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply a mutation to a staged copy, write it, then publish it
    ///
    /// When the file cannot be written the in-memory view is left untouched.
    async fn commit<T, F, Fut>(&self, mutation: F) -> CrudResult<T>
    where
        F: FnOnce(MemoryAdapter) -> Fut,
        Fut: Future<Output = CrudResult<T>>,
    {
        let _guard = self.write_lock.lock().await;
        let staged = self.store.detached()?;
        let outcome = mutation(staged.clone()).await?;
        self.write_file(&staged.snapshot()?).await?;
        self.store.replace_with(&staged)?;
        Ok(outcome)
    }

    async fn write_file(&self, docs: &[Document]) -> CrudResult<()> {
        let mut content = String::new();
        for doc in docs {
            let line = serde_json::to_string(doc)?;
            content.push_str(&line);
            content.push('\n');
        }

        let tmp = self.path.with_extension(format!("{}~", FILE_EXTENSION));
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

fn parse_lines(path: &Path, content: &str) -> CrudResult<IndexMap<String, Document>> {
    let mut docs = IndexMap::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| io_error(path, format!("line {}: {}", index + 1, e)))?;
        let Value::Object(doc) = value else {
            return Err(StorageError::InvalidDocument {
                message: format!("{} line {} is not an object", path.display(), index + 1),
            }
            .into());
        };
        let Some(id) = doc.get(ID_KEY).and_then(Value::as_str).map(str::to_string) else {
            return Err(StorageError::InvalidDocument {
                message: format!("{} line {} has no _id", path.display(), index + 1),
            }
            .into());
        };
        docs.insert(id, doc);
    }
    Ok(docs)
}

#[async_trait]
impl Adapter for FileAdapter {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn collection(&self) -> &str {
        self.store.collection()
    }

    async fn count(&self, query: &Query) -> CrudResult<usize> {
        self.store.count(query).await
    }

    async fn find(&self, query: &Query) -> CrudResult<Vec<Document>> {
        self.store.find(query).await
    }

    async fn get(&self, id: &str) -> CrudResult<Option<Document>> {
        self.store.get(id).await
    }

    async fn insert(&self, doc: Document) -> CrudResult<Document> {
        self.commit(|store| async move { store.insert(doc).await }).await
    }

    async fn update(&self, id: &str, patch: Document) -> CrudResult<Document> {
        self.commit(|store| async move { store.update(id, patch).await }).await
    }

    async fn remove(&self, id: &str) -> CrudResult<Document> {
        self.commit(|store| async move { store.remove(id).await }).await
    }

    async fn clear(&self) -> CrudResult<usize> {
        self.commit(|store| async move { store.clear().await }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_collection_file_name() {
        assert_eq!(collection_file_name("shop", "users"), "shop_users.db");
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop_users.db");

        let adapter = FileAdapter::open(&path, "users").unwrap();
        let stored = adapter.insert(doc(json!({"login": "admin"}))).await.unwrap();
        let id = stored["_id"].as_str().unwrap().to_string();
        drop(adapter);

        let reopened = FileAdapter::open(&path, "users").unwrap();
        let fetched = reopened.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched["login"], "admin");
    }

    #[tokio::test]
    async fn test_remove_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop_roles.db");

        let adapter = FileAdapter::open(&path, "roles").unwrap();
        let a = adapter.insert(doc(json!({"name": "a"}))).await.unwrap();
        adapter.insert(doc(json!({"name": "b"}))).await.unwrap();
        adapter.remove(a["_id"].as_str().unwrap()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"b\""));
    }

    #[test]
    fn test_corrupt_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.db");
        std::fs::write(&path, "{\"_id\":\"1\"}\nnot json\n").unwrap();

        let err = FileAdapter::open(&path, "bad").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_collection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        let path = data.join("shop_items.db");

        let adapter = FileAdapter::open(&path, "items").unwrap();
        let stored = adapter.insert(doc(json!({"name": "a", "qty": 1}))).await.unwrap();
        let id = stored["_id"].as_str().unwrap().to_string();

        std::fs::remove_dir_all(&data).unwrap();

        assert!(adapter.insert(doc(json!({"name": "b"}))).await.is_err());
        assert_eq!(adapter.count(&Query::new()).await.unwrap(), 1);

        assert!(adapter.update(&id, doc(json!({"qty": 9}))).await.is_err());
        assert_eq!(adapter.get(&id).await.unwrap().unwrap()["qty"], 1);

        assert!(adapter.remove(&id).await.is_err());
        assert!(adapter.clear().await.is_err());
        assert_eq!(adapter.count(&Query::new()).await.unwrap(), 1);
    }
}
