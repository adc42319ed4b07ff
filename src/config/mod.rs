//! Configuration loading and management
//!
//! Database settings are resolved once, at startup, from `DB_<ENTITY>_*`
//! variables with `DB_GENERIC_*` fallback, and then passed explicitly to the
//! [`ServiceFactory`](crate::factory::ServiceFactory). Nothing here reads the
//! environment after construction.

use crate::core::error::{ConfigError, CrudResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Prefix shared by every database variable
const DB_PREFIX: &str = "DB_";

/// Entity segment used for fallback values
const GENERIC: &str = "GENERIC";

/// Storage backend kind for one collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Volatile, process-local storage
    Memory,
    /// Local JSON-lines file per collection
    File,
    /// MongoDB document store
    Mongo,
    /// Reserved; no adapter exists
    Relational(String),
    /// Anything else, kept verbatim for error reporting
    Unrecognized(String),
}

impl Dialect {
    /// Parse a dialect tag. Never fails: unknown tags become `Unrecognized`.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "local" | "memory" | "in-memory" | "nedb" => Dialect::Memory,
            "file" => Dialect::File,
            "mongodb" | "mongo" => Dialect::Mongo,
            "postgres" | "mysql" | "sql" | "sqlite" | "mariadb" | "mssql" => {
                Dialect::Relational(tag.trim().to_string())
            }
            _ => Dialect::Unrecognized(tag.trim().to_string()),
        }
    }

    /// Local dialects generate identifiers eagerly on insert
    pub fn is_local(&self) -> bool {
        matches!(self, Dialect::Memory | Dialect::File)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Dialect::Memory => "local",
            Dialect::File => "file",
            Dialect::Mongo => "mongodb",
            Dialect::Relational(tag) | Dialect::Unrecognized(tag) => tag,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Dialect {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Dialect {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Dialect::parse(&tag))
    }
}

/// Storage backend description for one logical collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbInfo {
    pub dialect: Dialect,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub host: String,
    pub port: u16,
    #[serde(rename = "dbname")]
    pub db_name: String,
    pub collection: String,
}

impl DbInfo {
    /// Built-in defaults for an entity with nothing configured
    pub fn default_for(entity: &str) -> Self {
        Self {
            dialect: Dialect::Memory,
            user: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 27017,
            db_name: "app".to_string(),
            collection: format!("{}s", entity.to_ascii_lowercase()),
        }
    }
}

/// Raw, possibly partial, settings for one entity segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbSettings {
    pub dialect: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    #[serde(rename = "dbname")]
    pub db_name: Option<String>,
    pub collection: Option<String>,
}

/// Setting names recognised after `DB_<ENTITY>_`
const SETTING_KEYS: [&str; 7] = [
    "DIALECT",
    "USER",
    "PASSWORD",
    "HOST",
    "PORT",
    "DBNAME",
    "COLLECTION",
];

impl DbSettings {
    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "DIALECT" => Some(&mut self.dialect),
            "USER" => Some(&mut self.user),
            "PASSWORD" => Some(&mut self.password),
            "HOST" => Some(&mut self.host),
            "PORT" => Some(&mut self.port),
            "DBNAME" => Some(&mut self.db_name),
            "COLLECTION" => Some(&mut self.collection),
            _ => None,
        }
    }

    fn get(&self, key: &str) -> Option<&String> {
        match key {
            "DIALECT" => self.dialect.as_ref(),
            "USER" => self.user.as_ref(),
            "PASSWORD" => self.password.as_ref(),
            "HOST" => self.host.as_ref(),
            "PORT" => self.port.as_ref(),
            "DBNAME" => self.db_name.as_ref(),
            "COLLECTION" => self.collection.as_ref(),
            _ => None,
        }
    }
}

/// Immutable database configuration for every entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Fallback settings (`DB_GENERIC_*`)
    #[serde(default)]
    pub generic: DbSettings,

    /// Per-entity settings keyed by upper-case entity name
    #[serde(default)]
    pub entities: HashMap<String, DbSettings>,
}

impl DbConfig {
    /// Build from `(key, value)` pairs such as `std::env::vars()`
    ///
    /// Only `DB_<ENTITY>_<KEY>` pairs are considered; `<KEY>` is one of
    /// `DIALECT`, `USER`, `PASSWORD`, `HOST`, `PORT`, `DBNAME`, `COLLECTION`.
    /// Entity names may contain underscores (`DB_ORDER_LINE_HOST`).
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let Some(rest) = key.as_ref().strip_prefix(DB_PREFIX) else {
                continue;
            };
            let Some((entity, setting)) = rest.rsplit_once('_') else {
                continue;
            };
            if entity.is_empty() {
                continue;
            }

            if !SETTING_KEYS.contains(&setting) {
                continue;
            }

            let settings = if entity == GENERIC {
                &mut config.generic
            } else {
                config.entities.entry(entity.to_string()).or_default()
            };
            if let Some(slot) = settings.slot(setting) {
                *slot = Some(value.into());
            }
        }

        config
    }

    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Resolve the backend for an entity name (case-insensitive)
    ///
    /// Each key falls back independently: entity value, then generic value,
    /// then the built-in default.
    pub fn resolve(&self, entity: &str) -> CrudResult<DbInfo> {
        let defaults = DbInfo::default_for(entity);
        let specific = self.entities.get(&entity.to_ascii_uppercase());

        let pick = |key: &str| -> Option<String> {
            specific
                .and_then(|s| s.get(key))
                .or_else(|| self.generic.get(key))
                .cloned()
        };

        let port = match pick("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: format!("DB_{}_PORT", entity.to_ascii_uppercase()),
                    value: raw.clone(),
                    message: e.to_string(),
                })?,
            None => defaults.port,
        };

        Ok(DbInfo {
            dialect: pick("DIALECT")
                .map(|d| Dialect::parse(&d))
                .unwrap_or(defaults.dialect),
            user: pick("USER").unwrap_or(defaults.user),
            password: pick("PASSWORD").unwrap_or(defaults.password),
            host: pick("HOST").unwrap_or(defaults.host),
            port,
            db_name: pick("DBNAME").unwrap_or(defaults.db_name),
            collection: pick("COLLECTION").unwrap_or(defaults.collection),
        })
    }
}

/// Application-wide settings consumed by the factory and the seed loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment; selects the seed sub-directory
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Unknown dialects fall back to the in-memory adapter
    #[serde(default)]
    pub test_mode: bool,

    /// Base directory for `<environment>/<collection>.csv` seed files
    #[serde(default = "default_seed_dir")]
    pub seed_dir: PathBuf,

    /// Directory for file-dialect collections
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub databases: DbConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_seed_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/db")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            test_mode: false,
            seed_dir: default_seed_dir(),
            data_dir: default_data_dir(),
            databases: DbConfig::default(),
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl AppConfig {
    /// Build from `(key, value)` pairs
    ///
    /// Reads `APP_ENV`, `APP_TEST_MODE`, `APP_SEED_DIR`, `APP_DATA_DIR` and
    /// every `DB_*` variable. An environment named `test` turns test mode on.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let pairs: Vec<(String, String)> = vars
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.into()))
            .collect();

        let mut config = Self {
            databases: DbConfig::from_vars(pairs.iter().map(|(k, v)| (k.as_str(), v.clone()))),
            ..Self::default()
        };

        for (key, value) in &pairs {
            match key.as_str() {
                "APP_ENV" => config.environment = value.clone(),
                "APP_TEST_MODE" => config.test_mode = truthy(value),
                "APP_SEED_DIR" => config.seed_dir = PathBuf::from(value),
                "APP_DATA_DIR" => config.data_dir = PathBuf::from(value),
                _ => {}
            }
        }
        if config.environment == "test" {
            config.test_mode = true;
        }

        config
    }

    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> CrudResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                file: Some(path.to_string()),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> CrudResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Resolve the backend for an entity
    pub fn db_info(&self, entity: &str) -> CrudResult<DbInfo> {
        self.databases.resolve(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("local"), Dialect::Memory);
        assert_eq!(Dialect::parse("MongoDB"), Dialect::Mongo);
        assert_eq!(Dialect::parse(" file "), Dialect::File);
        assert_eq!(
            Dialect::parse("postgres"),
            Dialect::Relational("postgres".to_string())
        );
        assert_eq!(
            Dialect::parse("cassandra"),
            Dialect::Unrecognized("cassandra".to_string())
        );
        assert!(Dialect::Memory.is_local());
        assert!(Dialect::File.is_local());
        assert!(!Dialect::Mongo.is_local());
    }

    #[test]
    fn test_entity_keys_override_generic() {
        let config = DbConfig::from_vars([
            ("DB_GENERIC_DIALECT", "mongodb"),
            ("DB_GENERIC_HOST", "mongo.internal"),
            ("DB_GENERIC_DBNAME", "shop"),
            ("DB_USER_DIALECT", "local"),
            ("DB_USER_COLLECTION", "accounts"),
            ("PATH", "/usr/bin"),
        ]);

        let user = config.resolve("user").unwrap();
        assert_eq!(user.dialect, Dialect::Memory);
        assert_eq!(user.collection, "accounts");
        assert_eq!(user.host, "mongo.internal");
        assert_eq!(user.db_name, "shop");

        let product = config.resolve("product").unwrap();
        assert_eq!(product.dialect, Dialect::Mongo);
        assert_eq!(product.collection, "products");
        assert_eq!(product.port, 27017);
    }

    #[test]
    fn test_multi_word_entity_names() {
        let config = DbConfig::from_vars([("DB_ORDER_LINE_HOST", "db1")]);
        assert_eq!(config.resolve("order_line").unwrap().host, "db1");
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let config = DbConfig::from_vars([("DB_GENERIC_PORT", "http")]);
        let err = config.resolve("role").unwrap_err();
        assert!(err.to_string().contains("DB_ROLE_PORT"));
    }

    #[test]
    fn test_app_config_from_vars() {
        let config = AppConfig::from_vars([
            ("APP_ENV", "test"),
            ("APP_SEED_DIR", "/srv/seed"),
            ("DB_GENERIC_DIALECT", "file"),
        ]);
        assert!(config.test_mode);
        assert_eq!(config.seed_dir, PathBuf::from("/srv/seed"));
        assert_eq!(config.db_info("user").unwrap().dialect, Dialect::File);
    }

    #[test]
    fn test_yaml_config() {
        let yaml = r#"
environment: production
databases:
  generic:
    dialect: mongodb
    host: db
  entities:
    USER:
      dialect: local
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.environment, "production");
        assert!(!config.test_mode);
        assert_eq!(config.db_info("user").unwrap().dialect, Dialect::Memory);
        assert_eq!(config.db_info("role").unwrap().host, "db");
    }
}
