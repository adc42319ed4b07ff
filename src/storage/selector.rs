//! Adapter selection from a resolved [`DbInfo`]

use crate::config::{AppConfig, DbInfo, Dialect};
use crate::core::error::{ConfigError, CrudResult, StorageError};
use crate::storage::file::collection_file_name;
use crate::storage::{Adapter, FileAdapter, MemoryAdapter};
use std::sync::Arc;

/// Pick and construct the storage adapter for one collection
///
/// The returned adapter is bound to `collection` and owned by the caller.
/// Unrecognized dialects fall back to the in-memory adapter only in test
/// mode; relational dialects always fail.
pub fn select_adapter(
    info: &DbInfo,
    collection: &str,
    app: &AppConfig,
) -> CrudResult<Arc<dyn Adapter>> {
    let adapter: Arc<dyn Adapter> = match &info.dialect {
        Dialect::Memory => Arc::new(MemoryAdapter::new(collection)),
        Dialect::File => {
            std::fs::create_dir_all(&app.data_dir).map_err(|e| StorageError::IoError {
                path: app.data_dir.display().to_string(),
                message: e.to_string(),
            })?;
            let path = app
                .data_dir
                .join(collection_file_name(&info.db_name, collection));
            Arc::new(FileAdapter::open(path, collection)?)
        }
        Dialect::Mongo => mongo_adapter(info, collection)?,
        Dialect::Relational(tag) => {
            return Err(ConfigError::UnsupportedDialect {
                dialect: tag.clone(),
                message: "relational backends are not available".to_string(),
            }
            .into());
        }
        Dialect::Unrecognized(tag) => {
            if !app.test_mode {
                return Err(ConfigError::UnknownDialect {
                    dialect: tag.clone(),
                }
                .into());
            }
            tracing::warn!(
                dialect = %tag,
                collection = %collection,
                "Unknown dialect in test mode, using in-memory adapter"
            );
            Arc::new(MemoryAdapter::new(collection))
        }
    };

    tracing::info!(
        dialect = %info.dialect,
        backend = adapter.backend(),
        collection = %collection,
        "Storage adapter selected"
    );

    Ok(adapter)
}

#[cfg(feature = "mongodb_backend")]
fn mongo_adapter(info: &DbInfo, collection: &str) -> CrudResult<Arc<dyn Adapter>> {
    use crate::storage::mongodb::{MongoAdapter, build_uri};

    Ok(Arc::new(MongoAdapter::new(
        build_uri(info),
        info.db_name.clone(),
        collection,
    )))
}

#[cfg(not(feature = "mongodb_backend"))]
fn mongo_adapter(info: &DbInfo, _collection: &str) -> CrudResult<Arc<dyn Adapter>> {
    Err(ConfigError::UnsupportedDialect {
        dialect: info.dialect.to_string(),
        message: "compiled without the mongodb_backend feature".to_string(),
    }
    .into())
}
