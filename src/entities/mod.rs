//! Entity value objects shipped with the crate
//!
//! Each entity is a plain struct implementing [`Entity`](crate::core::Entity):
//! - [`User`]: account with login, contact data, language and roles
//! - [`Role`]: authority tag with a description
//! - [`Product`]: catalogue item with optional price, quantity and status

pub mod macros;
pub mod product;
pub mod role;
pub mod user;

pub use product::Product;
pub use role::{Role, RoleTag};
pub use user::{LangKey, User};

use crate::core::error::ValidationError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Collapse `validator` failures into one field error
///
/// The reported field is the first failing field in name order.
pub(crate) fn validation_failure(errors: validator::ValidationErrors) -> ValidationError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    ValidationError::FieldError {
        field: fields.into_iter().next().unwrap_or_default(),
        message: errors.to_string(),
    }
}

fn optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => Ok(Some(value)),
    }
}

/// Optional float that also accepts numeric strings (`"0"`, `"9.5"`)
pub(crate) fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match optional_number(deserializer)? {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("{} is not a float", n))),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
        Some(other) => Err(D::Error::custom(format!("expected a number, got {}", other))),
    }
}

/// Optional integer that also accepts numeric strings
pub(crate) fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match optional_number(deserializer)? {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("{} is not an integer", n))),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
        Some(other) => Err(D::Error::custom(format!("expected an integer, got {}", other))),
    }
}
