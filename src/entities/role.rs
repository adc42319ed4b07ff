//! Authority roles

use crate::core::entity::{Audit, Entity};
use crate::core::field::{FieldRule, FieldSpec};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::string_enum!(
    /// Authority granted to a user
    RoleTag {
        Admin => "ROLE_ADMIN",
        User => "ROLE_USER",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    pub name: RoleTag,

    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub audit: Audit,
}

impl Role {
    pub fn new(name: RoleTag, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name,
            description: description.into(),
            audit: Audit::default(),
        }
    }
}

const ROLE_RULES: &[FieldSpec] = &[FieldSpec::new("name", FieldRule::Enum(RoleTag::VALUES))];

impl Entity for Role {
    fn entity_name() -> &'static str {
        "role"
    }

    fn field_rules() -> &'static [FieldSpec] {
        ROLE_RULES
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
