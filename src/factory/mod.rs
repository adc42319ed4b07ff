//! Service factory and entity registry
//!
//! Entities are registered explicitly, either as core entities or under a
//! plugin namespace. The factory resolves a name (core first, then plugins),
//! looks up the entity's [`DbInfo`](crate::config::DbInfo), and returns a
//! [`ServiceMixin`] whose seed function is bound to the entity type.
//!
//! ```rust,ignore
//! let mut registry = EntityRegistry::new();
//! registry.register::<User>().register::<Role>();
//! registry.register_plugin::<Product>("shop");
//!
//! let factory = ServiceFactory::new(Arc::new(app), registry, Some(cacher), bus);
//! let users = factory.build_service::<User>(Some(1))?;
//! users.start().await?;
//! ```

use crate::config::AppConfig;
use crate::core::cache::Cacher;
use crate::core::entity::Entity;
use crate::core::error::{ConfigError, CrudResult};
use crate::core::events::EventBus;
use crate::mixin::{BaseMixin, BaseMixinConfig, CacheCleanHandler, DbService, SeedFn, ServiceMixin};
use crate::seed::{SeedPolicy, load_seed, seed_path};
use crate::storage::Adapter;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use std::any::TypeId;
use std::path::PathBuf;
use std::sync::Arc;

/// Where an entity was registered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
    Core,
    Plugin(String),
}

/// One registered entity type
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: &'static str,
    pub namespace: Namespace,
    type_id: TypeId,
    make_seed: fn(PathBuf) -> SeedFn,
}

impl Registration {
    fn of<E: Entity>(namespace: Namespace) -> Self {
        Self {
            name: E::entity_name(),
            namespace,
            type_id: TypeId::of::<E>(),
            make_seed: seed_fn::<E>,
        }
    }

    pub fn is<E: Entity>(&self) -> bool {
        self.type_id == TypeId::of::<E>()
    }

    /// Seed function loading the file at `path` into the adapter as `E`
    pub fn seed_fn(&self, path: PathBuf) -> SeedFn {
        (self.make_seed)(path)
    }
}

fn seed_fn<E: Entity>(path: PathBuf) -> SeedFn {
    Arc::new(move |adapter: Arc<dyn Adapter>| -> BoxFuture<'static, CrudResult<usize>> {
        let path = path.clone();
        async move { load_seed::<E>(&path, adapter.as_ref()).await }.boxed()
    })
}

/// Explicit registry of entity types
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    core: IndexMap<String, Registration>,
    plugins: IndexMap<String, Registration>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in user, role and product entities
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register::<crate::entities::User>()
            .register::<crate::entities::Role>()
            .register::<crate::entities::Product>();
        registry
    }

    /// Register a core entity; a later registration under the same name wins
    pub fn register<E: Entity>(&mut self) -> &mut Self {
        let key = E::entity_name().to_ascii_lowercase();
        self.core.insert(key, Registration::of::<E>(Namespace::Core));
        self
    }

    /// Register an entity provided by a plugin
    ///
    /// Plugin entities are only found when no core entity has the same name.
    /// The first plugin to register a name keeps it.
    pub fn register_plugin<E: Entity>(&mut self, plugin: &str) -> &mut Self {
        let key = E::entity_name().to_ascii_lowercase();
        if let Some(existing) = self.plugins.get(&key) {
            tracing::warn!(
                entity = %key,
                plugin = %plugin,
                existing = ?existing.namespace,
                "Plugin entity already registered, ignoring"
            );
            return self;
        }
        self.plugins.insert(
            key,
            Registration::of::<E>(Namespace::Plugin(plugin.to_string())),
        );
        self
    }

    /// Case-insensitive lookup: core entities first, then plugins
    pub fn lookup(&self, name: &str) -> Option<&Registration> {
        let key = name.to_ascii_lowercase();
        self.core.get(&key).or_else(|| self.plugins.get(&key))
    }

    pub fn names(&self) -> Vec<&str> {
        self.core
            .keys()
            .chain(self.plugins.keys().filter(|k| !self.core.contains_key(*k)))
            .map(String::as_str)
            .collect()
    }
}

/// Builds service mixins from configuration and the registry
pub struct ServiceFactory {
    app: Arc<AppConfig>,
    registry: EntityRegistry,
    cacher: Option<Arc<dyn Cacher>>,
    bus: EventBus,
    seed_policy: SeedPolicy,
}

impl std::fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceFactory")
            .field("app", &self.app)
            .field("registry", &self.registry)
            .field("has_cacher", &self.cacher.is_some())
            .field("seed_policy", &self.seed_policy)
            .finish()
    }
}

impl ServiceFactory {
    pub fn new(
        app: Arc<AppConfig>,
        registry: EntityRegistry,
        cacher: Option<Arc<dyn Cacher>>,
        bus: EventBus,
    ) -> Self {
        Self {
            app,
            registry,
            cacher,
            bus,
            seed_policy: SeedPolicy::default(),
        }
    }

    pub fn with_seed_policy(mut self, policy: SeedPolicy) -> Self {
        self.seed_policy = policy;
        self
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Build the mixin and cache-clean handlers for a registered entity
    ///
    /// An unregistered name is `ConfigError::UnknownEntity`.
    pub fn create(&self, name: &str) -> CrudResult<(ServiceMixin, Vec<CacheCleanHandler>)> {
        let registration = self.registry.lookup(name).ok_or_else(|| ConfigError::UnknownEntity {
            name: name.to_string(),
        })?;
        let db_info = self.app.db_info(registration.name)?;

        let base = BaseMixin::new(BaseMixinConfig {
            name: registration.name.to_string(),
            collection: db_info.collection.clone(),
            db_info: db_info.clone(),
            app: Arc::clone(&self.app),
            cacher: self.cacher.clone(),
            bus: self.bus.clone(),
            seed_policy: self.seed_policy,
        });

        let seed = registration.seed_fn(seed_path(&self.app, &db_info));
        let mixin = base.get_mixin(Some(seed))?;
        let events = base.get_events(std::slice::from_ref(base.scope()));

        tracing::info!(
            entity = registration.name,
            namespace = ?registration.namespace,
            dialect = %db_info.dialect,
            collection = %db_info.collection,
            "Service mixin created"
        );

        Ok((mixin, events))
    }

    /// Compose a runnable service for `E`
    ///
    /// `E` must be the type registered under its entity name.
    pub fn build_service<E: Entity>(&self, version: Option<u32>) -> CrudResult<Arc<DbService<E>>> {
        let name = E::entity_name();
        match self.registry.lookup(name) {
            Some(registration) if registration.is::<E>() => {}
            _ => {
                return Err(ConfigError::UnknownEntity {
                    name: name.to_string(),
                }
                .into());
            }
        }

        let (mixin, events) = self.create(name)?;
        let service_name = mixin.adapter().collection().to_string();
        Ok(Arc::new(DbService::new(service_name, version, mixin, events)))
    }
}
