//! Cell coercion for seed files
//!
//! Rules are tried in order and the first match wins:
//!
//! 1. empty cell: the column is left out of the record
//! 2. `true` / `false` (any case): boolean
//! 3. contains `|`: array of the non-empty pieces
//! 4. column named `password`: argon2 hash of the cell
//! 5. finite, nonzero number: integer when the text is integral, float otherwise
//! 6. `{...}`: JSON object, single quotes accepted
//! 7. anything else: string

use crate::core::password::hash_password;
use crate::seed::SeedError;
use serde_json::{Number, Value};

/// Column whose cells are hashed before insertion
pub const PASSWORD_COLUMN: &str = "password";

/// Separator for array cells
pub const LIST_SEPARATOR: char = '|';

/// Convert one raw cell into its JSON value; `None` means "omit the key"
pub fn coerce_cell(column: &str, raw: &str) -> Result<Option<Value>, SeedError> {
    if raw.is_empty() {
        return Ok(None);
    }

    if raw.eq_ignore_ascii_case("true") {
        return Ok(Some(Value::Bool(true)));
    }
    if raw.eq_ignore_ascii_case("false") {
        return Ok(Some(Value::Bool(false)));
    }

    if raw.contains(LIST_SEPARATOR) {
        let items = raw
            .split(LIST_SEPARATOR)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect();
        return Ok(Some(Value::Array(items)));
    }

    if column == PASSWORD_COLUMN {
        let hash = hash_password(raw).map_err(SeedError::Hash)?;
        return Ok(Some(Value::String(hash)));
    }

    if let Some(number) = parse_number(raw) {
        return Ok(Some(Value::Number(number)));
    }

    if raw.starts_with('{') && raw.ends_with('}') {
        return parse_loose_json(raw).map(Some);
    }

    Ok(Some(Value::String(raw.to_string())))
}

fn parse_number(raw: &str) -> Option<Number> {
    let float = raw.trim().parse::<f64>().ok()?;
    if !float.is_finite() || float == 0.0 {
        return None;
    }
    match raw.trim().parse::<i64>() {
        Ok(int) => Some(Number::from(int)),
        Err(_) => Number::from_f64(float),
    }
}

/// Parse a JSON object written with single quotes (`{'a': 1}`)
///
/// Every single quote becomes a double quote, so values may not contain
/// apostrophes.
pub fn parse_loose_json(raw: &str) -> Result<Value, SeedError> {
    let normalized = raw.replace('\'', "\"");
    serde_json::from_str(&normalized).map_err(|e| SeedError::Json {
        value: raw.to_string(),
        message: e.to_string(),
    })
}
