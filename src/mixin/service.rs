//! Generic CRUD service for one entity type
//!
//! A [`DbService`] wraps a [`ServiceMixin`] and speaks entities instead of
//! documents. Reads of single records and queries go through the process
//! cacher under keys prefixed by the service's full name; every mutation
//! cleans that prefix locally and announces itself on the event bus so that
//! other instances serving the same collection do the same.

use crate::core::entity::Entity;
use crate::core::error::{CrudError, CrudResult, EntityError, StorageError};
use crate::core::events::CacheEvent;
use crate::mixin::{CacheCleanHandler, CallContext, ChangeKind, SeedOutcome, ServiceMixin};
use crate::storage::{Adapter, Document, ID_KEY, Query};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Runnable service for entity type `E`
pub struct DbService<E: Entity> {
    name: String,
    full_name: String,
    mixin: ServiceMixin,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> std::fmt::Debug for DbService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbService")
            .field("full_name", &self.full_name)
            .field("entity", &E::entity_name())
            .field("mixin", &self.mixin)
            .finish()
    }
}

/// `v<version>.<name>`, or just the name when unversioned
pub fn service_full_name(name: &str, version: Option<u32>) -> String {
    match version {
        Some(v) => format!("v{}.{}", v, name),
        None => name.to_string(),
    }
}

impl<E: Entity> DbService<E> {
    /// Compose a service from a mixin and extra cache-clean subscriptions
    pub fn new(
        name: impl Into<String>,
        version: Option<u32>,
        mut mixin: ServiceMixin,
        events: Vec<CacheCleanHandler>,
    ) -> Self {
        let name = name.into();
        mixin.subscribe(events);
        Self {
            full_name: service_full_name(&name, version),
            name,
            mixin,
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn mixin(&self) -> &ServiceMixin {
        &self.mixin
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        self.mixin.adapter()
    }

    /// Names of every cache-clean event this service listens to
    pub fn event_names(&self) -> Vec<String> {
        self.mixin
            .handlers()
            .iter()
            .map(CacheCleanHandler::event_name)
            .collect()
    }

    pub async fn started(&self) -> CrudResult<SeedOutcome> {
        self.mixin.started().await
    }

    /// Subscribe to the bus and run the cache-clean loop in the background
    ///
    /// The task ends when the bus is dropped.
    pub fn listen(self: Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.mixin.bus().subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => {
                        self.handle_event(&envelope.event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed events may have been invalidations
                        tracing::warn!(
                            service = %self.full_name,
                            skipped = skipped,
                            "Event listener lagged, dropping cached entries"
                        );
                        self.clean_cache();
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!(service = %self.full_name, "Event bus closed");
                        break;
                    }
                }
            }
        })
    }

    /// Start listening, then run the seed check
    pub async fn start(self: &Arc<Self>) -> CrudResult<(JoinHandle<()>, SeedOutcome)> {
        let listener = Arc::clone(self).listen();
        let outcome = self.started().await?;
        Ok((listener, outcome))
    }

    /// Apply one bus event, returning how many cache entries were dropped
    pub fn handle_event(&self, event: &CacheEvent) -> usize {
        self.mixin
            .handlers()
            .iter()
            .filter(|handler| handler.matches(event))
            .map(|handler| handler.handle(&self.full_name, self.mixin.cacher()))
            .sum()
    }

    fn clean_cache(&self) -> usize {
        self.mixin
            .cacher()
            .map(|cacher| cacher.clean(&format!("{}.*", self.full_name)))
            .unwrap_or(0)
    }

    fn cache_key(&self, action: &str, params: &str) -> String {
        let mut hasher = DefaultHasher::new();
        params.hash(&mut hasher);
        format!("{}.{}:{:016x}", self.full_name, action, hasher.finish())
    }

    fn cached(&self, key: &str) -> Option<Value> {
        self.mixin.cacher().and_then(|cacher| cacher.get(key))
    }

    fn remember(&self, key: &str, value: &Value) {
        if let Some(cacher) = self.mixin.cacher() {
            cacher.set(key, value.clone());
        }
    }

    fn not_found(&self, id: &Uuid) -> CrudError {
        EntityError::NotFound {
            entity_type: E::entity_name().to_string(),
            id: id.to_string(),
        }
        .into()
    }

    fn decode_all(docs: Vec<Document>) -> CrudResult<Vec<E>> {
        docs.into_iter().map(E::from_storage_document).collect()
    }

    fn encode_all(entities: &[E]) -> CrudResult<Value> {
        entities
            .iter()
            .map(E::to_json)
            .collect::<CrudResult<Vec<_>>>()
            .map(Value::Array)
    }

    /// Every entity in the collection
    pub async fn list(&self) -> CrudResult<Vec<E>> {
        self.find(&Query::new()).await
    }

    /// Entities whose fields equal the query values
    pub async fn find(&self, query: &Query) -> CrudResult<Vec<E>> {
        let key = self.cache_key("find", &Value::Object(query.clone()).to_string());
        if let Some(Value::Array(items)) = self.cached(&key) {
            return items.into_iter().map(E::from_json).collect();
        }

        let entities = Self::decode_all(self.adapter().find(query).await?)?;
        self.remember(&key, &Self::encode_all(&entities)?);
        Ok(entities)
    }

    pub async fn find_one(&self, query: &Query) -> CrudResult<Option<E>> {
        self.adapter()
            .find_one(query)
            .await?
            .map(E::from_storage_document)
            .transpose()
    }

    /// One entity by id; a missing id is `EntityError::NotFound`
    pub async fn get(&self, id: &Uuid) -> CrudResult<E> {
        let key = self.cache_key("get", &id.to_string());
        if let Some(value) = self.cached(&key) {
            return E::from_json(value);
        }

        let doc = self
            .adapter()
            .get(&id.to_string())
            .await?
            .ok_or_else(|| self.not_found(id))?;
        let entity = E::from_storage_document(doc)?;
        self.remember(&key, &entity.to_json()?);
        Ok(entity)
    }

    pub async fn count(&self, query: &Query) -> CrudResult<usize> {
        self.adapter().count(query).await
    }

    /// Reject values already held by another record in a unique field
    ///
    /// Look-before-write: two concurrent creates can both pass.
    pub async fn ensure_unique(&self, entity: &E, except: Option<&Uuid>) -> CrudResult<()> {
        let json = entity.to_json()?;
        let except = except.map(Uuid::to_string);

        for field in E::unique_fields() {
            let value = match json.get(*field) {
                None | Some(Value::Null) => continue,
                Some(value) => value.clone(),
            };
            let mut query = Query::new();
            query.insert(field.to_string(), value.clone());

            let clash = self
                .adapter()
                .find(&query)
                .await?
                .into_iter()
                .any(|doc| doc.get(ID_KEY).and_then(Value::as_str) != except.as_deref());
            if clash {
                return Err(EntityError::AlreadyExists {
                    entity_type: E::entity_name().to_string(),
                    field: field.to_string(),
                    value: match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    },
                }
                .into());
            }
        }
        Ok(())
    }

    /// Insert a new entity; any id it carries is discarded
    pub async fn create(&self, mut entity: E, ctx: &CallContext) -> CrudResult<E> {
        entity.validate_fields()?;
        entity.set_id(None);
        self.ensure_unique(&entity, None).await?;
        entity.audit_mut().mark_created(ctx.user_id());

        let stored = self.adapter().insert(entity.to_storage_document()?).await?;
        let created = E::from_storage_document(stored)?;
        self.changed(ChangeKind::Created, &created)?;
        Ok(created)
    }

    /// Merge `patch` (entity JSON form) over the stored entity
    pub async fn update(&self, id: &Uuid, patch: Value, ctx: &CallContext) -> CrudResult<E> {
        let Value::Object(mut patch) = patch else {
            return Err(EntityError::SerializationError {
                entity_type: E::entity_name().to_string(),
                message: "update patch must be a JSON object".to_string(),
            }
            .into());
        };
        patch.remove("id");
        patch.remove(ID_KEY);

        let current = self
            .adapter()
            .get(&id.to_string())
            .await?
            .ok_or_else(|| self.not_found(id))?;
        let stored_keys: Vec<String> = current.keys().cloned().collect();
        let Value::Object(mut merged) = E::from_storage_document(current)?.to_json()? else {
            return Err(CrudError::Internal("entity did not serialize to an object".to_string()));
        };
        merged.extend(patch);

        let mut entity = E::from_json(Value::Object(merged))?;
        entity.validate_fields()?;
        self.ensure_unique(&entity, Some(id)).await?;
        entity.audit_mut().mark_modified(ctx.user_id());

        // Fields cleared by the patch are absent from the projection
        let mut projection = entity.to_storage_document()?;
        for key in stored_keys {
            if key != ID_KEY && !projection.contains_key(&key) {
                projection.insert(key, Value::Null);
            }
        }

        let stored = self
            .adapter()
            .update(&id.to_string(), projection)
            .await
            .map_err(|e| self.map_missing(e, id))?;
        let updated = E::from_storage_document(stored)?;
        self.changed(ChangeKind::Updated, &updated)?;
        Ok(updated)
    }

    pub async fn remove(&self, id: &Uuid, _ctx: &CallContext) -> CrudResult<E> {
        let removed = self
            .adapter()
            .remove(&id.to_string())
            .await
            .map_err(|e| self.map_missing(e, id))?;
        let entity = E::from_storage_document(removed)?;
        self.changed(ChangeKind::Removed, &entity)?;
        Ok(entity)
    }

    fn map_missing(&self, err: CrudError, id: &Uuid) -> CrudError {
        match err {
            CrudError::Storage(StorageError::NotFound { .. }) => self.not_found(id),
            other => other,
        }
    }

    fn changed(&self, kind: ChangeKind, entity: &E) -> CrudResult<()> {
        self.clean_cache();
        self.mixin
            .entity_changed(kind, &entity.to_json()?, &self.full_name);
        Ok(())
    }
}
