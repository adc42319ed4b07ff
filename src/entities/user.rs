//! User accounts

use crate::core::entity::{Audit, Entity};
use crate::core::error::ValidationError;
use crate::core::field::{FieldRule, FieldSpec};
use crate::entities::role::RoleTag;
use crate::entities::validation_failure;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

crate::string_enum!(
    /// Interface language of a user
    LangKey {
        En => "en",
        Fr => "fr",
        De => "de",
        Es => "es",
        It => "it",
        Pt => "pt",
        Nl => "nl",
        Ru => "ru",
        Ja => "ja",
        Zh => "zh",
    }
);

impl Default for LangKey {
    fn default() -> Self {
        LangKey::En
    }
}

/// An account able to authenticate
///
/// `password` holds an argon2 hash once the user went through
/// [`UserService::create`](crate::services::UserService::create) or a seed
/// file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[validate(length(min = 1, max = 50))]
    pub login: String,

    #[validate(email)]
    pub email: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub lang_key: LangKey,

    #[serde(default)]
    pub roles: Vec<RoleTag>,

    #[serde(default)]
    pub activated: bool,

    #[serde(flatten)]
    pub audit: Audit,
}

impl User {
    pub fn new(login: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            login: login.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            password: String::new(),
            lang_key: LangKey::default(),
            roles: vec![RoleTag::User],
            activated: false,
            audit: Audit::default(),
        }
    }

    pub fn has_role(&self, role: RoleTag) -> bool {
        self.roles.contains(&role)
    }

    /// Copy without the password hash, for handing to callers
    pub fn redacted(&self) -> Self {
        Self {
            password: String::new(),
            ..self.clone()
        }
    }
}

const USER_RULES: &[FieldSpec] = &[
    FieldSpec::new("langKey", FieldRule::Enum(LangKey::VALUES)),
    FieldSpec::new("roles", FieldRule::EnumList(RoleTag::VALUES)),
];

impl Entity for User {
    fn entity_name() -> &'static str {
        "user"
    }

    fn field_rules() -> &'static [FieldSpec] {
        USER_RULES
    }

    fn unique_fields() -> &'static [&'static str] {
        &["login", "email"]
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

    fn validate_fields(&self) -> Result<(), ValidationError> {
        self.validate().map_err(validation_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CrudError;
    use serde_json::json;

    #[test]
    fn test_from_json_with_defaults() {
        let user = User::from_json(json!({
            "login": "admin",
            "email": "admin@localhost",
            "langKey": "fr",
            "roles": ["ROLE_ADMIN", "ROLE_USER"]
        }))
        .unwrap();
        assert_eq!(user.lang_key, LangKey::Fr);
        assert!(user.has_role(RoleTag::Admin));
        assert!(!user.activated);
        assert_eq!(user.id, None);
    }

    #[test]
    fn test_single_role_string_is_widened() {
        let user = User::from_json(json!({
            "login": "user",
            "email": "user@localhost",
            "roles": "ROLE_USER"
        }))
        .unwrap();
        assert_eq!(user.roles, vec![RoleTag::User]);
    }

    #[test]
    fn test_unknown_lang_key_is_rejected() {
        let err = User::from_json(json!({
            "login": "user",
            "email": "user@localhost",
            "langKey": "xx"
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            CrudError::Validation(ValidationError::InvalidEnumValue { .. })
        ));
        assert!(err.to_string().contains("'xx'"));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let err = User::from_json(json!({
            "login": "user",
            "email": "user@localhost",
            "roles": ["ROLE_USER", "ROLE_ROOT"]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("ROLE_ROOT"));
    }

    #[test]
    fn test_enum_values_round_trip() {
        let mut user = User::new("a", "a@b.io");
        user.lang_key = LangKey::De;
        user.roles = vec![RoleTag::Admin];
        let json = user.to_json().unwrap();
        assert_eq!(json["langKey"], "de");
        assert_eq!(json["roles"], json!(["ROLE_ADMIN"]));
        assert_eq!(User::from_json(json).unwrap(), user);
    }

    #[test]
    fn test_validate_fields_checks_email() {
        assert!(User::new("a", "a@b.io").validate_fields().is_ok());
        let err = User::new("a", "not-an-email").validate_fields().unwrap_err();
        assert!(matches!(err, ValidationError::FieldError { ref field, .. } if field == "email"));
    }

    #[test]
    fn test_redacted_clears_password() {
        let mut user = User::new("a", "a@b.io");
        user.password = "$argon2id$...".to_string();
        assert!(user.redacted().password.is_empty());
    }
}
