//! Domain services built on [`DbService`](crate::mixin::DbService)
//!
//! Each service wraps the generic runtime for its entity and adds the
//! operations that need domain knowledge (password handling, lookups by
//! natural key). Uniqueness of natural keys is enforced by the generic
//! runtime through [`Entity::unique_fields`](crate::core::Entity::unique_fields).

pub mod product;
pub mod role;
pub mod user;

pub use product::ProductService;
pub use role::RoleService;
pub use user::UserService;

use crate::storage::Query;
use serde_json::Value;

/// Single-field equality query
pub(crate) fn query_by(field: &str, value: impl Into<Value>) -> Query {
    let mut query = Query::new();
    query.insert(field.to_string(), value.into());
    query
}
