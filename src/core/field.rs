//! Field conversion rules applied when a raw record becomes an entity
//!
//! Each entity declares a static list of [`FieldSpec`]s. [`apply_rules`]
//! runs them over the JSON form of a record before it is deserialized, so
//! that enum violations are reported with every offending value at once and
//! date-only strings are widened to full ISO-8601 timestamps.

use crate::core::error::ValidationError;
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

/// Conversion applied to one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Passed through unchanged
    Identity,
    /// ISO-8601 timestamp; `YYYY-MM-DD` is accepted and read as midnight UTC
    Date,
    /// Single string that must belong to the set
    Enum(&'static [&'static str]),
    /// One or more strings that must all belong to the set; a bare string
    /// is read as a one-element list
    EnumList(&'static [&'static str]),
}

/// A named field and its rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rule: FieldRule,
}

impl FieldSpec {
    pub const fn new(name: &'static str, rule: FieldRule) -> Self {
        Self { name, rule }
    }
}

fn invalid_enum(field: &str, values: Vec<String>, allowed: &[&str]) -> ValidationError {
    ValidationError::InvalidEnumValue {
        field: field.to_string(),
        values,
        allowed: allowed.iter().map(|v| v.to_string()).collect(),
    }
}

/// Check a single value against an enum set
pub fn check_enum(field: &str, value: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid_enum(field, vec![value.to_string()], allowed))
    }
}

fn convert_date(field: &str, raw: &str) -> Result<Value, ValidationError> {
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return Ok(Value::String(raw.to_string()));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ValidationError::FieldError {
            field: field.to_string(),
            message: format!("'{}' is not an ISO-8601 date", raw),
        }
    })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().to_rfc3339())
        .ok_or_else(|| ValidationError::FieldError {
            field: field.to_string(),
            message: format!("'{}' has no midnight", raw),
        })?;
    Ok(Value::String(midnight))
}

fn apply_rule(spec: &FieldSpec, value: &mut Value) -> Result<(), ValidationError> {
    match (spec.rule, &*value) {
        (FieldRule::Identity, _) | (_, Value::Null) => Ok(()),
        (FieldRule::Date, Value::String(raw)) => {
            *value = convert_date(spec.name, raw)?;
            Ok(())
        }
        (FieldRule::Date, other) => Err(ValidationError::FieldError {
            field: spec.name.to_string(),
            message: format!("expected a date string, got {}", other),
        }),
        (FieldRule::Enum(allowed), Value::String(s)) => check_enum(spec.name, s, allowed),
        (FieldRule::Enum(allowed), other) => {
            Err(invalid_enum(spec.name, vec![other.to_string()], allowed))
        }
        (FieldRule::EnumList(allowed), Value::String(s)) => {
            check_enum(spec.name, s, allowed)?;
            *value = Value::Array(vec![Value::String(s.clone())]);
            Ok(())
        }
        (FieldRule::EnumList(allowed), Value::Array(items)) => {
            let offenders: Vec<String> = items
                .iter()
                .filter(|item| !item.as_str().is_some_and(|s| allowed.contains(&s)))
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            if offenders.is_empty() {
                Ok(())
            } else {
                Err(invalid_enum(spec.name, offenders, allowed))
            }
        }
        (FieldRule::EnumList(allowed), other) => {
            Err(invalid_enum(spec.name, vec![other.to_string()], allowed))
        }
    }
}

/// Apply every rule to the matching keys of a record, in place
///
/// Absent and null fields are left alone; only enum membership and date
/// shape are checked here.
pub fn apply_rules(rules: &[FieldSpec], record: &mut Map<String, Value>) -> Result<(), ValidationError> {
    for spec in rules {
        if let Some(value) = record.get_mut(spec.name) {
            apply_rule(spec, value)?;
        }
    }
    Ok(())
}
