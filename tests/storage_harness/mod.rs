//! Shared test harness for storage adapter testing
//!
//! Provides document helpers and the `adapter_contract_tests!` macro that
//! checks any [`Adapter`](crudkit::storage::Adapter) implementation against
//! the full contract.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! adapter_contract_tests!(memory_contract, MemoryAdapter::new(TEST_COLLECTION));
//! ```

#![allow(dead_code)]

#[macro_use]
mod adapter_tests;

use async_trait::async_trait;
use crudkit::core::error::CrudResult;
use crudkit::storage::{Adapter, Document, FileAdapter, Query};
use serde_json::Value;
use tempfile::TempDir;

/// Collection name every contract test binds to
pub const TEST_COLLECTION: &str = "items";

/// Build a document from a JSON object literal
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// A product-like document covering string, number, bool and list fields
pub fn item(name: &str, price: f64, qty: i64, active: bool, tags: &[&str]) -> Document {
    doc(serde_json::json!({
        "name": name,
        "price": price,
        "qty": qty,
        "active": active,
        "tags": tags,
    }))
}

/// File adapter over a fresh, empty collection file
///
/// Owns its temporary directory, which is removed when the adapter drops.
pub struct ScratchFileAdapter {
    inner: FileAdapter,
    _dir: TempDir,
}

#[async_trait]
impl Adapter for ScratchFileAdapter {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    fn collection(&self) -> &str {
        self.inner.collection()
    }

    async fn count(&self, query: &Query) -> CrudResult<usize> {
        self.inner.count(query).await
    }

    async fn find(&self, query: &Query) -> CrudResult<Vec<Document>> {
        self.inner.find(query).await
    }

    async fn get(&self, id: &str) -> CrudResult<Option<Document>> {
        self.inner.get(id).await
    }

    async fn insert(&self, doc: Document) -> CrudResult<Document> {
        self.inner.insert(doc).await
    }

    async fn update(&self, id: &str, patch: Document) -> CrudResult<Document> {
        self.inner.update(id, patch).await
    }

    async fn remove(&self, id: &str) -> CrudResult<Document> {
        self.inner.remove(id).await
    }

    async fn clear(&self) -> CrudResult<usize> {
        self.inner.clear().await
    }
}

pub fn file_adapter(collection: &str) -> ScratchFileAdapter {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join(format!("test_{}.db", collection));
    ScratchFileAdapter {
        inner: FileAdapter::open(path, collection).expect("Failed to open file adapter"),
        _dir: dir,
    }
}
