//! Entity trait defining the core abstraction for all stored records
//!
//! Every entity has:
//! - an optional identifier, assigned by storage on insert
//! - domain fields with per-field conversion rules ([`FieldSpec`])
//! - audit fields filled only when the entity is mutated through a service
//!
//! Storage sees entities as JSON documents keyed by `_id`; the conversion
//! lives in [`Entity::to_storage_document`] and
//! [`Entity::from_storage_document`].

use crate::core::error::{CrudResult, EntityError, ValidationError};
use crate::core::field::{FieldSpec, apply_rules};
use crate::storage::{Document, ID_KEY};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Key carrying the identifier in the entity's own JSON form
pub const ENTITY_ID_KEY: &str = "id";

/// Audit trail shared by every entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl Audit {
    /// Stamp creation; the modification pair mirrors it
    pub fn mark_created(&mut self, by: Option<&str>) {
        let now = Utc::now();
        self.created_by = by.map(str::to_string);
        self.created_date = Some(now);
        self.last_modified_by = self.created_by.clone();
        self.last_modified_date = Some(now);
    }

    pub fn mark_modified(&mut self, by: Option<&str>) {
        self.last_modified_by = by.map(str::to_string);
        self.last_modified_date = Some(Utc::now());
    }
}

/// Field rules for the audit dates, appended to every entity's own rules
pub const AUDIT_RULES: &[FieldSpec] = &[
    FieldSpec::new("createdDate", crate::core::field::FieldRule::Date),
    FieldSpec::new("lastModifiedDate", crate::core::field::FieldRule::Date),
];

/// Base trait for all entities
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Logical entity name used for registration and configuration (e.g. "user")
    fn entity_name() -> &'static str;

    /// Conversion rules for this entity's own fields
    fn field_rules() -> &'static [FieldSpec] {
        &[]
    }

    /// Fields whose values must be unique within the collection
    fn unique_fields() -> &'static [&'static str] {
        &[]
    }

    fn id(&self) -> Option<Uuid>;

    fn set_id(&mut self, id: Option<Uuid>);

    fn audit(&self) -> &Audit;

    fn audit_mut(&mut self) -> &mut Audit;

    /// Service-level validation (formats, lengths); not run on deserialization
    fn validate_fields(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Build an entity from its JSON form, applying the field rules first
    fn from_json(value: Value) -> CrudResult<Self> {
        let Value::Object(mut record) = value else {
            return Err(EntityError::SerializationError {
                entity_type: Self::entity_name().to_string(),
                message: "expected a JSON object".to_string(),
            }
            .into());
        };
        apply_rules(Self::field_rules(), &mut record)?;
        apply_rules(AUDIT_RULES, &mut record)?;

        serde_json::from_value(Value::Object(record)).map_err(|e| {
            EntityError::SerializationError {
                entity_type: Self::entity_name().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// The entity's JSON form (identifier under `id`)
    fn to_json(&self) -> CrudResult<Value> {
        serde_json::to_value(self).map_err(|e| {
            EntityError::SerializationError {
                entity_type: Self::entity_name().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Storage-ready projection
    ///
    /// The identifier moves to `_id` as a string; when it is absent the key
    /// is left out entirely so inserts never submit an explicit null.
    fn to_storage_document(&self) -> CrudResult<Document> {
        let Value::Object(mut doc) = self.to_json()? else {
            return Err(EntityError::SerializationError {
                entity_type: Self::entity_name().to_string(),
                message: "entity did not serialize to an object".to_string(),
            }
            .into());
        };
        doc.remove(ENTITY_ID_KEY);
        doc.remove(ID_KEY);
        if let Some(id) = self.id() {
            doc.insert(ID_KEY.to_string(), Value::String(id.to_string()));
        }
        Ok(doc)
    }

    /// Inverse of [`Entity::to_storage_document`]
    fn from_storage_document(mut doc: Document) -> CrudResult<Self> {
        if let Some(id) = doc.remove(ID_KEY) {
            doc.insert(ENTITY_ID_KEY.to_string(), id);
        }
        Self::from_json(Value::Object(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldRule;
    use serde_json::json;

    const COLORS: &[&str] = &["red", "blue"];

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Widget {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<Uuid>,
        name: String,
        color: String,
        #[serde(flatten)]
        audit: Audit,
    }

    impl Entity for Widget {
        fn entity_name() -> &'static str {
            "widget"
        }

        fn field_rules() -> &'static [FieldSpec] {
            const RULES: &[FieldSpec] = &[FieldSpec::new("color", FieldRule::Enum(COLORS))];
            RULES
        }

        fn id(&self) -> Option<Uuid> {
            self.id
        }

        fn set_id(&mut self, id: Option<Uuid>) {
            self.id = id;
        }

        fn audit(&self) -> &Audit {
            &self.audit
        }

        fn audit_mut(&mut self) -> &mut Audit {
            &mut self.audit
        }
    }

    fn widget(id: Option<Uuid>) -> Widget {
        Widget {
            id,
            name: "w".to_string(),
            color: "red".to_string(),
            audit: Audit::default(),
        }
    }

    #[test]
    fn test_storage_document_omits_missing_id() {
        let doc = widget(None).to_storage_document().unwrap();
        assert!(!doc.contains_key("_id"));
        assert!(!doc.contains_key("id"));
        assert_eq!(doc["name"], "w");
    }

    #[test]
    fn test_storage_document_stringifies_id() {
        let id = Uuid::new_v4();
        let doc = widget(Some(id)).to_storage_document().unwrap();
        assert_eq!(doc["_id"], Value::String(id.to_string()));
        assert!(!doc.contains_key("id"));
    }

    #[test]
    fn test_storage_roundtrip_restores_id() {
        let id = Uuid::new_v4();
        let doc = widget(Some(id)).to_storage_document().unwrap();
        let back = Widget::from_storage_document(doc).unwrap();
        assert_eq!(back.id, Some(id));
    }

    #[test]
    fn test_audit_fields_absent_until_mutation() {
        let json = widget(None).to_json().unwrap();
        assert!(json.get("createdDate").is_none());
        assert!(json.get("lastModifiedBy").is_none());

        let mut w = widget(None);
        w.audit_mut().mark_created(Some("admin"));
        let json = w.to_json().unwrap();
        assert_eq!(json["createdBy"], "admin");
        assert!(json["createdDate"].is_string());
    }

    #[test]
    fn test_from_json_applies_enum_rule() {
        let err = Widget::from_json(json!({"name": "w", "color": "green"})).unwrap_err();
        assert!(err.to_string().contains("'green'"));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(Widget::from_json(json!([1, 2])).is_err());
    }
}
