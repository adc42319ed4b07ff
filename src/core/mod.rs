//! Core module containing fundamental traits and types for the crate

pub mod cache;
pub mod entity;
pub mod error;
pub mod events;
pub mod field;
pub mod password;

pub use cache::{Cacher, MemoryCacher};
pub use entity::{Audit, Entity};
pub use error::{CrudError, CrudResult};
pub use events::{CacheEvent, CacheScope, EventBus};
pub use field::{FieldRule, FieldSpec};
