//! Base mixin builder
//!
//! A [`BaseMixin`] is built once per logical service from a
//! [`BaseMixinConfig`]. It owns nothing but the resolved settings and the
//! derived [`CacheScope`]; [`BaseMixin::get_mixin`] turns it into a runnable
//! [`ServiceMixin`] holding the selected adapter, the seed function and the
//! cache-clean subscription for its own scope.
//!
//! ```rust,ignore
//! let base = BaseMixin::new(config);
//! let mixin = base.get_mixin(Some(seed))?;
//! let events = base.get_events(&[base.scope().clone()]);
//! let service = DbService::<User>::new("users", Some(1), mixin, events);
//! ```

pub mod service;

use crate::config::{AppConfig, DbInfo};
use crate::core::cache::Cacher;
use crate::core::error::CrudResult;
use crate::core::events::{CacheEvent, CacheScope, EventBus};
use crate::seed::SeedPolicy;
use crate::storage::{Adapter, Query, select_adapter};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub use service::DbService;

/// Seed function: fills the adapter, returning how many rows were inserted
pub type SeedFn =
    Arc<dyn Fn(Arc<dyn Adapter>) -> BoxFuture<'static, CrudResult<usize>> + Send + Sync>;

/// Who performs a mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub user_id: Option<String>,
}

impl CallContext {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Kind of mutation reported to `entity_changed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// Result of the start-up seed check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The collection was empty and this many rows were inserted
    Seeded(usize),
    /// Nothing to do: no seed function, policy `Never`, or rows already present
    Skipped,
}

/// Everything needed to build one service's mixin
#[derive(Clone)]
pub struct BaseMixinConfig {
    /// Logical mixin name (usually the entity name)
    pub name: String,
    pub collection: String,
    pub db_info: DbInfo,
    pub app: Arc<AppConfig>,
    pub cacher: Option<Arc<dyn Cacher>>,
    pub bus: EventBus,
    pub seed_policy: SeedPolicy,
}

impl fmt::Debug for BaseMixinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseMixinConfig")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("db_info", &self.db_info)
            .field("has_cacher", &self.cacher.is_some())
            .field("seed_policy", &self.seed_policy)
            .finish()
    }
}

/// Cache-clean subscription for one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheCleanHandler {
    scope: CacheScope,
}

impl CacheCleanHandler {
    pub fn new(scope: CacheScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &CacheScope {
        &self.scope
    }

    pub fn event_name(&self) -> String {
        self.scope.event_name()
    }

    pub fn matches(&self, event: &CacheEvent) -> bool {
        event.scope() == &self.scope
    }

    /// Drop every entry cached under `full_name`, returning the count
    pub fn handle(&self, full_name: &str, cacher: Option<&dyn Cacher>) -> usize {
        let Some(cacher) = cacher else {
            return 0;
        };
        let removed = cacher.clean(&format!("{}.*", full_name));
        tracing::debug!(
            service = %full_name,
            event = %self.event_name(),
            count = removed,
            "Cache cleaned"
        );
        removed
    }
}

/// Builder holding one service's resolved settings
#[derive(Debug, Clone)]
pub struct BaseMixin {
    config: BaseMixinConfig,
    scope: CacheScope,
}

impl BaseMixin {
    pub fn new(config: BaseMixinConfig) -> Self {
        let scope = CacheScope::new(config.db_info.db_name.clone(), config.collection.clone());
        Self { config, scope }
    }

    pub fn config(&self) -> &BaseMixinConfig {
        &self.config
    }

    pub fn scope(&self) -> &CacheScope {
        &self.scope
    }

    pub fn cache_clean_event_name(&self) -> String {
        self.scope.event_name()
    }

    /// Select the adapter and assemble the runnable mixin
    pub fn get_mixin(&self, seed: Option<SeedFn>) -> CrudResult<ServiceMixin> {
        let adapter = select_adapter(&self.config.db_info, &self.config.collection, &self.config.app)?;

        Ok(ServiceMixin {
            name: self.config.name.clone(),
            adapter,
            seed,
            seed_policy: self.config.seed_policy,
            scope: self.scope.clone(),
            handlers: vec![CacheCleanHandler::new(self.scope.clone())],
            cacher: self.config.cacher.clone(),
            bus: self.config.bus.clone(),
        })
    }

    /// One cache-clean handler per scope
    pub fn get_events(&self, scopes: &[CacheScope]) -> Vec<CacheCleanHandler> {
        scopes.iter().cloned().map(CacheCleanHandler::new).collect()
    }
}

/// Runtime half of a service: storage, seeding and cache invalidation
#[derive(Clone)]
pub struct ServiceMixin {
    name: String,
    adapter: Arc<dyn Adapter>,
    seed: Option<SeedFn>,
    seed_policy: SeedPolicy,
    scope: CacheScope,
    handlers: Vec<CacheCleanHandler>,
    cacher: Option<Arc<dyn Cacher>>,
    bus: EventBus,
}

impl fmt::Debug for ServiceMixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceMixin")
            .field("name", &self.name)
            .field("backend", &self.adapter.backend())
            .field("collection", &self.adapter.collection())
            .field("has_seed", &self.seed.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

impl ServiceMixin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn scope(&self) -> &CacheScope {
        &self.scope
    }

    pub fn handlers(&self) -> &[CacheCleanHandler] {
        &self.handlers
    }

    pub fn cacher(&self) -> Option<&dyn Cacher> {
        self.cacher.as_deref()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Add subscriptions, ignoring scopes already present
    pub fn subscribe(&mut self, handlers: impl IntoIterator<Item = CacheCleanHandler>) {
        for handler in handlers {
            if !self.handlers.contains(&handler) {
                self.handlers.push(handler);
            }
        }
    }

    /// Seed the collection if it is empty
    ///
    /// Not guarded against another instance doing the same at the same time.
    pub async fn started(&self) -> CrudResult<SeedOutcome> {
        let Some(seed) = &self.seed else {
            return Ok(SeedOutcome::Skipped);
        };
        if self.seed_policy == SeedPolicy::Never {
            return Ok(SeedOutcome::Skipped);
        }

        let count = self.adapter.count(&Query::new()).await?;
        if count > 0 {
            tracing::debug!(
                service = %self.name,
                collection = %self.adapter.collection(),
                count = count,
                "Collection not empty, seed skipped"
            );
            return Ok(SeedOutcome::Skipped);
        }

        let inserted = seed(self.adapter.clone()).await?;
        tracing::info!(
            service = %self.name,
            collection = %self.adapter.collection(),
            count = inserted,
            "Seed finished"
        );
        Ok(SeedOutcome::Seeded(inserted))
    }

    /// Announce a mutation on every subscribed scope
    ///
    /// Returns the total number of receivers reached.
    pub fn entity_changed(&self, kind: ChangeKind, record: &Value, origin: &str) -> usize {
        tracing::debug!(
            service = %origin,
            change = %kind,
            id = ?record.get("id").map(ToString::to_string),
            "Entity changed"
        );

        self.handlers
            .iter()
            .map(|handler| {
                self.bus.publish(CacheEvent::Invalidate {
                    scope: handler.scope().clone(),
                    origin: origin.to_string(),
                })
            })
            .sum()
    }
}
