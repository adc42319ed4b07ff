//! # crudkit
//!
//! Per-entity CRUD services composed at startup from a storage adapter, an
//! entity value object and a seed pipeline, with cache invalidation shared by
//! every instance serving the same collection.
//!
//! ## Features
//!
//! - **Dialect selection**: in-memory, file-backed and MongoDB adapters picked
//!   from `DB_<ENTITY>_*` settings with `DB_GENERIC_*` fallback
//! - **Seeding**: empty collections are filled once from
//!   `<seed_dir>/<environment>/<collection>.csv`
//! - **Typed entities**: enum-tag validation, audit fields, storage projection
//! - **Cache invalidation**: `cache.clean.<dbname>.<collection>` events over a
//!   broadcast bus
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crudkit::prelude::*;
//!
//! let app = Arc::new(AppConfig::from_env());
//! let factory = ServiceFactory::new(
//!     app,
//!     EntityRegistry::with_defaults(),
//!     Some(Arc::new(MemoryCacher::new())),
//!     EventBus::default(),
//! );
//!
//! let users = UserService::new(factory.build_service::<User>(Some(1))?);
//! users.db().start().await?;
//!
//! let admin = users.authenticate("admin", "admin").await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod factory;
pub mod mixin;
pub mod seed;
pub mod services;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Configuration ===
    pub use crate::config::{AppConfig, DbConfig, DbInfo, Dialect};

    // === Core ===
    pub use crate::core::{
        cache::{Cacher, MemoryCacher},
        entity::{Audit, Entity},
        error::{
            ConfigError, CrudError, CrudResult, EntityError, SeedError, StorageError,
            ValidationError,
        },
        events::{CacheEvent, CacheScope, EventBus, EventEnvelope},
        field::{FieldRule, FieldSpec},
    };

    // === Storage ===
    pub use crate::storage::{Adapter, Document, FileAdapter, MemoryAdapter, Query, select_adapter};

    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoAdapter;

    // === Composition ===
    pub use crate::factory::{EntityRegistry, ServiceFactory};
    pub use crate::mixin::{
        BaseMixin, BaseMixinConfig, CacheCleanHandler, CallContext, ChangeKind, DbService,
        SeedOutcome, ServiceMixin,
    };
    pub use crate::seed::{SeedPolicy, load_seed};

    // === Entities & services ===
    pub use crate::entities::{LangKey, Product, Role, RoleTag, User};
    pub use crate::services::{ProductService, RoleService, UserService};

    // === Macros ===
    pub use crate::string_enum;

    // === External re-exports ===
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
