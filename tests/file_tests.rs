//! Integration tests for FileAdapter using the storage test harness.
//!
//! Besides the shared contract, checks that the JSON-lines file is the
//! source of truth across reopen.

#[macro_use]
mod storage_harness;

use crudkit::storage::{Adapter, FileAdapter, Query};
use serde_json::json;
use storage_harness::*;

adapter_contract_tests!(file_contract, file_adapter(TEST_COLLECTION));

#[tokio::test]
async fn test_update_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop_items.db");

    let adapter = FileAdapter::open(&path, TEST_COLLECTION).unwrap();
    let stored = adapter.insert(item("Widget", 9.99, 1, true, &[])).await.unwrap();
    let id = stored["_id"].as_str().unwrap().to_string();
    adapter.update(&id, doc(json!({"qty": 5}))).await.unwrap();
    drop(adapter);

    let reopened = FileAdapter::open(&path, TEST_COLLECTION).unwrap();
    assert_eq!(reopened.count(&Query::new()).await.unwrap(), 1);
    assert_eq!(reopened.get(&id).await.unwrap().unwrap()["qty"], 5);
}

#[tokio::test]
async fn test_one_line_per_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop_items.db");
    let adapter = FileAdapter::open(&path, TEST_COLLECTION).unwrap();
    for name in ["A", "B", "C"] {
        adapter.insert(item(name, 1.0, 1, true, &[])).await.unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|doc| doc["_id"].is_string()));
}

#[tokio::test]
async fn test_clear_empties_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop_items.db");
    let adapter = FileAdapter::open(&path, TEST_COLLECTION).unwrap();
    adapter.insert(item("A", 1.0, 1, true, &[])).await.unwrap();
    adapter.clear().await.unwrap();

    assert!(std::fs::read_to_string(&path).unwrap().trim().is_empty());
}
