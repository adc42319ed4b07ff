//! Process-wide cache layer
//!
//! Keys are dotted paths beginning with the owning service's full name
//! (`v1.users.get:<id>`). [`Cacher::clean`] takes a wildcard pattern where
//! `*` matches within one dot-separated segment and `**` matches across
//! segments.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Cache storage shared by every service in the process
pub trait Cacher: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    /// Remove every key matching the wildcard pattern, returning the count
    fn clean(&self, pattern: &str) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Translate a wildcard pattern into an anchored regex
pub fn pattern_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**") {
            expr.push_str(".*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            expr.push_str("[^.]*");
            rest = tail;
        } else {
            let next = rest.find('*').unwrap_or(rest.len());
            expr.push_str(&regex::escape(&rest[..next]));
            rest = &rest[next..];
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

/// In-memory cacher
#[derive(Debug, Default)]
pub struct MemoryCacher {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryCacher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cacher for MemoryCacher {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value);
        }
    }

    fn clean(&self, pattern: &str) -> usize {
        let Ok(regex) = pattern_to_regex(pattern) else {
            return 0;
        };
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|key, _| !regex.is_match(key));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }
}
