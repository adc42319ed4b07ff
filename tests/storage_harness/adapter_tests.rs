//! Macro-generated test suite for `Adapter` contract validation.
//!
//! The `adapter_contract_tests!` macro generates a test module that validates
//! any storage adapter against the contract: identifier assignment, equality
//! queries, `$set`/`$unset`-style updates, removal and concurrent access.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use crudkit::storage::MemoryAdapter;
//!
//! adapter_contract_tests!(memory_contract, MemoryAdapter::new(TEST_COLLECTION));
//! ```
//!
//! Attributes placed before the suite name (for example
//! `#[ignore = "requires Docker"]`) are applied to every generated test.

/// Generate a full `Adapter` conformance test suite.
///
/// `$factory` must evaluate to a value implementing `Adapter + 'static`,
/// bound to [`TEST_COLLECTION`](super::TEST_COLLECTION) and empty. It is
/// re-evaluated for each test and may contain `.await`.
#[macro_export]
macro_rules! adapter_contract_tests {
    ($(#[$attr:meta])* $suite:ident, $factory:expr) => {
        mod $suite {
            use super::*;
            use crudkit::core::error::{CrudError, StorageError};
            use crudkit::storage::{Adapter, Query};
            use serde_json::json;
            use std::sync::Arc;

            // ==================================================================
            // Identity
            // ==================================================================

            $(#[$attr])*
            #[tokio::test]
            async fn test_reports_collection() {
                let adapter = $factory;
                assert_eq!(adapter.collection(), TEST_COLLECTION);
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_insert_assigns_string_id() {
                let adapter = $factory;
                let stored = adapter
                    .insert(item("Widget", 9.99, 3, true, &["a"]))
                    .await
                    .unwrap();
                let id = stored["_id"].as_str().expect("_id must be a string");
                assert!(uuid::Uuid::parse_str(id).is_ok());

                let fetched = adapter.get(id).await.unwrap().unwrap();
                assert_eq!(fetched["name"], "Widget");
                assert_eq!(fetched["qty"], 3);
                assert_eq!(fetched["active"], true);
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_insert_keeps_explicit_id() {
                let adapter = $factory;
                let mut record = item("Fixed", 1.0, 1, true, &[]);
                record.insert("_id".to_string(), json!("fixed-id"));
                let stored = adapter.insert(record).await.unwrap();
                assert_eq!(stored["_id"], "fixed-id");
                assert!(adapter.get("fixed-id").await.unwrap().is_some());
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_insert_duplicate_id_is_rejected() {
                let adapter = $factory;
                let mut first = item("A", 1.0, 1, true, &[]);
                first.insert("_id".to_string(), json!("dup"));
                adapter.insert(first).await.unwrap();

                let mut second = item("B", 2.0, 2, false, &[]);
                second.insert("_id".to_string(), json!("dup"));
                let err = adapter.insert(second).await.unwrap_err();
                assert!(matches!(
                    err,
                    CrudError::Storage(StorageError::DuplicateKey { ref id, .. }) if id == "dup"
                ));

                let stored = adapter.get("dup").await.unwrap().unwrap();
                assert_eq!(stored["name"], "A");
                assert_eq!(adapter.count(&Query::new()).await.unwrap(), 1);
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_get_missing_is_none() {
                let adapter = $factory;
                assert!(adapter.get("missing").await.unwrap().is_none());
            }

            // ==================================================================
            // Queries
            // ==================================================================

            $(#[$attr])*
            #[tokio::test]
            async fn test_find_and_count() {
                let adapter = $factory;
                adapter.insert(item("A", 1.5, 1, true, &["x", "y"])).await.unwrap();
                adapter.insert(item("B", 2.5, 2, false, &["y"])).await.unwrap();
                adapter.insert(item("C", 3.5, 2, true, &[])).await.unwrap();

                assert_eq!(adapter.count(&Query::new()).await.unwrap(), 3);
                assert_eq!(adapter.find(&Query::new()).await.unwrap().len(), 3);

                let active = adapter.find(&doc(json!({"active": true}))).await.unwrap();
                assert_eq!(active.len(), 2);

                assert_eq!(adapter.count(&doc(json!({"qty": 2}))).await.unwrap(), 2);
                assert_eq!(adapter.count(&doc(json!({"price": 2.5}))).await.unwrap(), 1);
                assert_eq!(adapter.count(&doc(json!({"tags": "y"}))).await.unwrap(), 2);
                assert_eq!(
                    adapter.count(&doc(json!({"qty": 2, "active": true}))).await.unwrap(),
                    1
                );
                assert_eq!(adapter.count(&doc(json!({"name": "Z"}))).await.unwrap(), 0);
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_find_one() {
                let adapter = $factory;
                adapter.insert(item("A", 1.0, 1, true, &[])).await.unwrap();

                let found = adapter.find_one(&doc(json!({"name": "A"}))).await.unwrap();
                assert_eq!(found.unwrap()["name"], "A");
                assert!(adapter.find_one(&doc(json!({"name": "B"}))).await.unwrap().is_none());
            }

            // ==================================================================
            // Mutations
            // ==================================================================

            $(#[$attr])*
            #[tokio::test]
            async fn test_update_merges_fields() {
                let adapter = $factory;
                let stored = adapter.insert(item("A", 1.0, 1, true, &[])).await.unwrap();
                let id = stored["_id"].as_str().unwrap().to_string();

                let updated = adapter
                    .update(&id, doc(json!({"qty": 7, "note": "restocked"})))
                    .await
                    .unwrap();
                assert_eq!(updated["_id"], json!(id));
                assert_eq!(updated["qty"], 7);
                assert_eq!(updated["name"], "A");
                assert_eq!(updated["note"], "restocked");

                let fetched = adapter.get(&id).await.unwrap().unwrap();
                assert_eq!(fetched["qty"], 7);
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_update_null_removes_field() {
                let adapter = $factory;
                let stored = adapter.insert(item("A", 1.0, 1, true, &[])).await.unwrap();
                let id = stored["_id"].as_str().unwrap().to_string();

                let updated = adapter
                    .update(&id, doc(json!({"price": null, "qty": 4})))
                    .await
                    .unwrap();
                assert!(updated.get("price").is_none());
                assert_eq!(updated["qty"], 4);

                let fetched = adapter.get(&id).await.unwrap().unwrap();
                assert!(fetched.get("price").is_none());
                assert_eq!(fetched["name"], "A");
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_update_missing_is_not_found() {
                let adapter = $factory;
                let err = adapter
                    .update("missing", doc(json!({"qty": 1})))
                    .await
                    .unwrap_err();
                assert!(matches!(err, CrudError::Storage(StorageError::NotFound { .. })));
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_remove_returns_document() {
                let adapter = $factory;
                let stored = adapter.insert(item("A", 1.0, 1, true, &[])).await.unwrap();
                let id = stored["_id"].as_str().unwrap().to_string();

                let removed = adapter.remove(&id).await.unwrap();
                assert_eq!(removed["name"], "A");
                assert!(adapter.get(&id).await.unwrap().is_none());

                let err = adapter.remove(&id).await.unwrap_err();
                assert!(matches!(err, CrudError::Storage(StorageError::NotFound { .. })));
            }

            $(#[$attr])*
            #[tokio::test]
            async fn test_clear_counts_removed() {
                let adapter = $factory;
                for name in ["A", "B", "C"] {
                    adapter.insert(item(name, 1.0, 1, true, &[])).await.unwrap();
                }
                assert_eq!(adapter.clear().await.unwrap(), 3);
                assert_eq!(adapter.count(&Query::new()).await.unwrap(), 0);
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            $(#[$attr])*
            #[tokio::test]
            async fn test_concurrent_inserts() {
                let adapter: Arc<dyn Adapter> = Arc::new($factory);

                let handles: Vec<_> = (0..10)
                    .map(|i| {
                        let adapter = Arc::clone(&adapter);
                        tokio::spawn(async move {
                            adapter
                                .insert(item(&format!("item-{}", i), 1.0, i, true, &[]))
                                .await
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.await.unwrap().unwrap();
                }
                assert_eq!(adapter.count(&Query::new()).await.unwrap(), 10);
            }
        }
    };
}
