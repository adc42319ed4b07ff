//! Seed loading from per-environment CSV files
//!
//! A collection is seeded from `<seed_dir>/<environment>/<collection>.csv`.
//! The first row names the columns; `#` lines and blank lines are skipped.
//! Rows are read one at a time. Cells go through [`coerce::coerce_cell`],
//! then the row is turned into the entity type before it reaches storage,
//! so a malformed row stops the load instead of writing a half-typed record.

pub mod coerce;

use crate::config::{AppConfig, DbInfo};
use crate::core::entity::Entity;
use crate::core::error::CrudResult;
use crate::storage::{Adapter, Document};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use coerce::{coerce_cell, parse_loose_json};

/// Extension of seed files
pub const SEED_EXTENSION: &str = "csv";

/// Failures while loading seed data
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Cannot read seed file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Invalid seed row in '{path}' at line {line}: {message}")]
    InvalidRow {
        path: String,
        line: u64,
        message: String,
    },

    #[error("Invalid JSON cell '{value}': {message}")]
    Json { value: String, message: String },

    #[error("Failed to hash seed password: {0}")]
    Hash(#[source] argon2::password_hash::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// When a service seeds its collection on start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Seed when the collection count is zero
    ///
    /// Two instances starting together against a shared backend may both
    /// see an empty collection and both seed it.
    #[default]
    IfEmpty,
    /// Never seed
    Never,
}

/// Location of the seed file for one collection
pub fn seed_path(app: &AppConfig, info: &DbInfo) -> PathBuf {
    app.seed_dir
        .join(&app.environment)
        .join(format!("{}.{}", info.collection, SEED_EXTENSION))
}

/// One parsed seed row
#[derive(Debug, Clone, PartialEq)]
pub struct SeedRow {
    /// 1-based line in the source file
    pub line: u64,
    pub record: Document,
}

/// Lazy row reader over one seed file
///
/// Each call to `next` reads and coerces a single row, so a bad row is only
/// reported once every row before it has been handed out.
pub struct SeedReader {
    path: String,
    headers: csv::StringRecord,
    records: csv::StringRecordsIntoIter<File>,
}

impl SeedReader {
    /// Open a seed file and read its header row
    pub fn open(path: &Path) -> Result<Self, SeedError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| SeedError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let headers = reader.headers()?.clone();
        Ok(Self {
            path: path.display().to_string(),
            headers,
            records: reader.into_records(),
        })
    }

    fn coerce_record(&self, record: &csv::StringRecord) -> Result<SeedRow, SeedError> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let mut doc = Document::new();
        for (column, raw) in self.headers.iter().zip(record.iter()) {
            let value = coerce_cell(column, raw).map_err(|e| SeedError::InvalidRow {
                path: self.path.clone(),
                line,
                message: e.to_string(),
            })?;
            if let Some(value) = value {
                doc.insert(column.to_string(), value);
            }
        }
        Ok(SeedRow { line, record: doc })
    }
}

impl Iterator for SeedReader {
    type Item = Result<SeedRow, SeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        Some(self.coerce_record(&record))
    }
}

/// Read and coerce every row of a seed file
pub fn read_rows(path: &Path) -> Result<Vec<SeedRow>, SeedError> {
    SeedReader::open(path)?.collect()
}

/// Seed `adapter` from the file at `path`, returning the inserted count
///
/// A missing file is not an error. A row that cannot be read, coerced or
/// turned into a valid `E` aborts the load; rows inserted before it stay. A row the adapter refuses
/// is logged and skipped.
pub async fn load_seed<E: Entity>(path: &Path, adapter: &dyn Adapter) -> CrudResult<usize> {
    if !path.exists() {
        tracing::debug!(
            path = %path.display(),
            collection = %adapter.collection(),
            "No seed file, skipping"
        );
        return Ok(0);
    }

    let mut inserted = 0;

    for row in SeedReader::open(path)? {
        let row = row?;
        let invalid = |message: String| SeedError::InvalidRow {
            path: path.display().to_string(),
            line: row.line,
            message,
        };

        let entity = E::from_json(Value::Object(row.record.clone()))
            .map_err(|e| invalid(e.to_string()))?;
        entity
            .validate_fields()
            .map_err(|e| invalid(e.to_string()))?;
        let doc = entity.to_storage_document()?;

        match adapter.insert(doc).await {
            Ok(_) => inserted += 1,
            Err(e) => {
                tracing::warn!(
                    collection = %adapter.collection(),
                    line = row.line,
                    error = %e,
                    "Seed row rejected by storage, skipping"
                );
            }
        }
    }

    tracing::info!(
        collection = %adapter.collection(),
        entity = E::entity_name(),
        count = inserted,
        "Seeded collection"
    );

    Ok(inserted)
}
