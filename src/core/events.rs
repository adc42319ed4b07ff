//! Internal event bus for cache invalidation
//!
//! Services that mutate a collection publish [`CacheEvent::Invalidate`] for
//! the collection's [`CacheScope`]; every service instance subscribed to that
//! scope drops its locally cached entries on receipt.
//!
//! # Architecture
//!
//! ```text
//! DbService::create ──┐
//! DbService::update ──┼──▶ EventBus::publish() ──▶ broadcast channel ──▶ DbService::listen (every instance)
//! DbService::remove ──┘                                                    └─▶ Cacher::clean("<full name>.*")
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = EventBus::new(1024);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(CacheEvent::Invalidate {
//!     scope: CacheScope::new("shop", "users"),
//!     origin: "v1.users".to_string(),
//! });
//!
//! if let Ok(envelope) = rx.recv().await {
//!     println!("Received: {}", envelope.event.name());
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Prefix of every cache-clean event name
pub const CACHE_CLEAN_PREFIX: &str = "cache.clean";

/// Escape a name component so that joined names stay unambiguous
fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace('.', "%2E")
}

/// Derive the cache-clean event name for one logical collection
///
/// Plain names give `cache.clean.<dbname>.<collection>`. Dots and percent
/// signs inside a component are percent-encoded, so distinct
/// `(dbname, collection)` pairs always give distinct names.
pub fn cache_clean_event_name(db_name: &str, collection: &str) -> String {
    format!(
        "{}.{}.{}",
        CACHE_CLEAN_PREFIX,
        escape_segment(db_name),
        escape_segment(collection)
    )
}

/// One logical collection, shared by every instance that serves it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheScope {
    pub db_name: String,
    pub collection: String,
}

impl CacheScope {
    pub fn new(db_name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            collection: collection.into(),
        }
    }

    pub fn event_name(&self) -> String {
        cache_clean_event_name(&self.db_name, &self.collection)
    }
}

/// Cache events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CacheEvent {
    /// Entries cached for this scope are stale
    Invalidate {
        scope: CacheScope,
        /// Full name of the publishing service
        origin: String,
    },
}

impl CacheEvent {
    /// Broadcast name of the event
    pub fn name(&self) -> String {
        match self {
            CacheEvent::Invalidate { scope, .. } => scope.event_name(),
        }
    }

    pub fn scope(&self) -> &CacheScope {
        match self {
            CacheEvent::Invalidate { scope, .. } => scope,
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: CacheEvent,
}

impl EventEnvelope {
    pub fn new(event: CacheEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone (Arc internally) and shared by every service in the process.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// The capacity determines how many events can be buffered before
    /// slow receivers start losing events (lagged).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails. Returns the number of receivers that will see the event.
    pub fn publish(&self, event: CacheEvent) -> usize {
        let envelope = EventEnvelope::new(event);
        // send() returns Err only if there are no receivers
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name_format() {
        assert_eq!(
            cache_clean_event_name("shop", "users"),
            "cache.clean.shop.users"
        );
        assert_eq!(
            CacheScope::new("shop", "users").event_name(),
            "cache.clean.shop.users"
        );
    }

    #[test]
    fn test_event_names_do_not_collide_on_dots() {
        assert_ne!(
            cache_clean_event_name("a.b", "c"),
            cache_clean_event_name("a", "b.c")
        );
        assert_ne!(
            cache_clean_event_name("a%2Eb", "c"),
            cache_clean_event_name("a.b", "c")
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = CacheEvent::Invalidate {
            scope: CacheScope::new("shop", "users"),
            origin: "v1.users".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "invalidate");
        assert_eq!(json["scope"]["collection"], "users");
        assert_eq!(event.name(), "cache.clean.shop.users");
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = CacheEvent::Invalidate {
            scope: CacheScope::new("shop", "roles"),
            origin: "roles".to_string(),
        };
        assert_eq!(bus.publish(event.clone()), 2);

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.id, e2.id);
        assert_eq!(e1.event, event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let event = CacheEvent::Invalidate {
            scope: CacheScope::new("shop", "roles"),
            origin: "roles".to_string(),
        };
        assert_eq!(bus.publish(event), 0);
    }
}
