//! Catalogue products

use crate::core::entity::{Audit, Entity};
use crate::entities::{lenient_f64, lenient_i64};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(flatten)]
    pub audit: Audit,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            price: None,
            quantity: None,
            active: None,
            audit: Audit::default(),
        }
    }

    /// Unset `active` counts as active
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

impl Entity for Product {
    fn entity_name() -> &'static str {
        "product"
    }

    fn unique_fields() -> &'static [&'static str] {
        &["name"]
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_fields_absent() {
        let product = Product::from_json(json!({"name": "Widget"})).unwrap();
        assert_eq!(product.price, None);
        assert_eq!(product.quantity, None);
        assert!(product.is_active());

        let json = product.to_json().unwrap();
        assert!(json.get("price").is_none());
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let product = Product::from_json(json!({"name": "Gadget", "price": "0", "quantity": "0"})).unwrap();
        assert_eq!(product.price, Some(0.0));
        assert_eq!(product.quantity, Some(0));
    }

    #[test]
    fn test_integer_price_is_float() {
        let product = Product::from_json(json!({"name": "Bolt", "price": 3, "active": false})).unwrap();
        assert_eq!(product.price, Some(3.0));
        assert!(!product.is_active());
    }

    #[test]
    fn test_storage_projection() {
        let id = Uuid::new_v4();
        let mut product = Product::new("Widget");
        product.id = Some(id);
        let doc = product.to_storage_document().unwrap();
        assert_eq!(doc["_id"], json!(id.to_string()));
        assert!(!doc.contains_key("id"));
    }
}
