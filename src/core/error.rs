//! Typed error handling for crudkit
//!
//! Errors are grouped by the layer that raises them so that callers can tell
//! a fatal startup mistake (configuration, seed data) from a request-time
//! failure (entity not found, duplicate key).
//!
//! # Error Categories
//!
//! - [`ConfigError`]: dialect, entity registration and configuration loading
//! - [`EntityError`]: CRUD-level failures surfaced to callers
//! - [`ValidationError`]: field conversion and enum membership failures
//! - [`StorageError`]: failures raised by a storage adapter
//! - [`SeedError`]: failures while loading a seed file
//!
//! # Example
//!
//! ```rust,ignore
//! match factory.create("user") {
//!     Ok((mixin, events)) => { /* compose the service */ }
//!     Err(CrudError::Config(ConfigError::UnknownEntity { name })) => {
//!         panic!("no entity registered as {name}");
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```

use serde::Serialize;
use std::fmt;

pub use crate::seed::SeedError;

/// The main error type for crudkit
#[derive(Debug)]
pub enum CrudError {
    /// Configuration errors (fatal at startup)
    Config(ConfigError),

    /// Entity-related errors (CRUD operations)
    Entity(EntityError),

    /// Validation errors
    Validation(ValidationError),

    /// Storage backend errors
    Storage(StorageError),

    /// Seed loading errors (fatal for the seeding service)
    Seed(SeedError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for CrudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrudError::Config(e) => write!(f, "{}", e),
            CrudError::Entity(e) => write!(f, "{}", e),
            CrudError::Validation(e) => write!(f, "{}", e),
            CrudError::Storage(e) => write!(f, "{}", e),
            CrudError::Seed(e) => write!(f, "{}", e),
            CrudError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for CrudError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrudError::Config(e) => Some(e),
            CrudError::Entity(e) => Some(e),
            CrudError::Validation(e) => Some(e),
            CrudError::Storage(e) => Some(e),
            CrudError::Seed(e) => Some(e),
            CrudError::Internal(_) => None,
        }
    }
}

/// Error payload handed back to callers of the service layer
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl CrudError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            CrudError::Config(_) => "CONFIG_ERROR",
            CrudError::Entity(e) => e.error_code(),
            CrudError::Validation(_) => "VALIDATION_ERROR",
            CrudError::Storage(_) => "STORAGE_ERROR",
            CrudError::Seed(_) => "SEED_ERROR",
            CrudError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors that must stop the process at startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrudError::Config(_) | CrudError::Seed(_))
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration and service definition
#[derive(Debug)]
pub enum ConfigError {
    /// Dialect is not one of the known backends
    UnknownDialect { dialect: String },

    /// Dialect is known but has no adapter
    UnsupportedDialect { dialect: String, message: String },

    /// No entity registered under this name (core or plugin)
    UnknownEntity { name: String },

    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while preparing configuration-driven resources
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownDialect { dialect } => {
                write!(f, "Unknown database dialect '{}'", dialect)
            }
            ConfigError::UnsupportedDialect { dialect, message } => {
                write!(f, "Unsupported database dialect '{}': {}", dialect, message)
            }
            ConfigError::UnknownEntity { name } => {
                write!(f, "No entity registered under name '{}'", name)
            }
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for CrudError {
    fn from(err: ConfigError) -> Self {
        CrudError::Config(err)
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity operations
#[derive(Debug)]
pub enum EntityError {
    /// Entity was not found
    NotFound { entity_type: String, id: String },

    /// Another entity already holds a unique value
    AlreadyExists {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Failed to serialize/deserialize entity
    SerializationError {
        entity_type: String,
        message: String,
    },
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::NotFound { entity_type, id } => {
                write!(f, "{} with id '{}' not found", entity_type, id)
            }
            EntityError::AlreadyExists {
                entity_type,
                field,
                value,
            } => {
                write!(
                    f,
                    "{} with {} '{}' already exists",
                    entity_type, field, value
                )
            }
            EntityError::SerializationError {
                entity_type,
                message,
            } => {
                write!(
                    f,
                    "Failed to serialize/deserialize {}: {}",
                    entity_type, message
                )
            }
        }
    }
}

impl std::error::Error for EntityError {}

impl EntityError {
    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            EntityError::SerializationError { .. } => "ENTITY_SERIALIZATION_ERROR",
        }
    }
}

impl From<EntityError> for CrudError {
    fn from(err: EntityError) -> Self {
        CrudError::Entity(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to field conversion and validation
#[derive(Debug)]
pub enum ValidationError {
    /// Value is outside the declared enum set
    InvalidEnumValue {
        field: String,
        values: Vec<String>,
        allowed: Vec<String>,
    },

    /// Single field validation error
    FieldError { field: String, message: String },

    /// Invalid JSON format
    InvalidJson { message: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEnumValue {
                field,
                values,
                allowed,
            } => {
                write!(
                    f,
                    "Invalid enum value {} for field '{}' (allowed: {})",
                    values
                        .iter()
                        .map(|v| format!("'{}'", v))
                        .collect::<Vec<_>>()
                        .join(", "),
                    field,
                    allowed.join(", ")
                )
            }
            ValidationError::FieldError { field, message } => {
                write!(f, "Validation error for field '{}': {}", field, message)
            }
            ValidationError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for CrudError {
    fn from(err: ValidationError) -> Self {
        CrudError::Validation(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug)]
pub enum StorageError {
    /// Connection error
    ConnectionError { backend: String, message: String },

    /// Query execution error
    QueryError { backend: String, message: String },

    /// Document addressed by id does not exist
    NotFound { collection: String, id: String },

    /// A document with this id is already stored
    DuplicateKey { collection: String, id: String },

    /// Stored document is not a JSON object
    InvalidDocument { message: String },

    /// Persistence file could not be read or written
    IoError { path: String, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionError { backend, message } => {
                write!(f, "Failed to connect to {}: {}", backend, message)
            }
            StorageError::QueryError { backend, message } => {
                write!(f, "{} query error: {}", backend, message)
            }
            StorageError::NotFound { collection, id } => {
                write!(f, "Document '{}' not found in '{}'", id, collection)
            }
            StorageError::DuplicateKey { collection, id } => {
                write!(f, "Duplicate key: '{}' already exists in '{}'", id, collection)
            }
            StorageError::InvalidDocument { message } => {
                write!(f, "Invalid document: {}", message)
            }
            StorageError::IoError { path, message } => {
                write!(f, "Storage IO error on '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for CrudError {
    fn from(err: StorageError) -> Self {
        CrudError::Storage(err)
    }
}

impl From<SeedError> for CrudError {
    fn from(err: SeedError) -> Self {
        CrudError::Seed(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for CrudError {
    fn from(err: serde_json::Error) -> Self {
        CrudError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for CrudError {
    fn from(err: std::io::Error) -> Self {
        CrudError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for CrudError {
    fn from(err: serde_yaml::Error) -> Self {
        CrudError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<csv::Error> for CrudError {
    fn from(err: csv::Error) -> Self {
        CrudError::Seed(SeedError::Csv(err))
    }
}

impl From<anyhow::Error> for CrudError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CrudError>() {
            Ok(crud) => crud,
            Err(other) => CrudError::Internal(other.to_string()),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for crudkit operations
pub type CrudResult<T> = Result<T, CrudError>;
