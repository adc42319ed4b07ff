use crate::core::error::{CrudError, CrudResult, ValidationError};
use crate::core::password::{hash_password, is_hashed, verify_password};
use crate::entities::User;
use crate::mixin::{CallContext, DbService};
use crate::services::query_by;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Accounts: creation with hashed passwords and credential checks
#[derive(Debug, Clone)]
pub struct UserService {
    db: Arc<DbService<User>>,
}

fn hash(plain: &str) -> CrudResult<String> {
    if plain.is_empty() {
        return Err(ValidationError::FieldError {
            field: "password".to_string(),
            message: "must not be empty".to_string(),
        }
        .into());
    }
    hash_password(plain).map_err(|e| CrudError::Internal(format!("Failed to hash password: {}", e)))
}

impl UserService {
    pub fn new(db: Arc<DbService<User>>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<DbService<User>> {
        &self.db
    }

    /// Create a user, hashing a plaintext password
    ///
    /// Duplicate `login` or `email` is `EntityError::AlreadyExists`.
    pub async fn create(&self, mut user: User, ctx: &CallContext) -> CrudResult<User> {
        if !is_hashed(&user.password) {
            user.password = hash(&user.password)?;
        }
        self.db.create(user, ctx).await
    }

    pub async fn get(&self, id: &Uuid) -> CrudResult<User> {
        self.db.get(id).await
    }

    pub async fn list(&self) -> CrudResult<Vec<User>> {
        self.db.list().await
    }

    pub async fn find_by_login(&self, login: &str) -> CrudResult<Option<User>> {
        self.db.find_one(&query_by("login", login)).await
    }

    pub async fn find_by_email(&self, email: &str) -> CrudResult<Option<User>> {
        self.db.find_one(&query_by("email", email)).await
    }

    /// Check credentials; `None` for an unknown login or a wrong password
    pub async fn authenticate(&self, login: &str, password: &str) -> CrudResult<Option<User>> {
        let Some(user) = self.find_by_login(login).await? else {
            tracing::debug!(login = %login, "Authentication failed: unknown login");
            return Ok(None);
        };
        if !verify_password(password, &user.password) {
            tracing::debug!(login = %login, "Authentication failed: wrong password");
            return Ok(None);
        }
        Ok(Some(user.redacted()))
    }

    pub async fn change_password(
        &self,
        id: &Uuid,
        new_password: &str,
        ctx: &CallContext,
    ) -> CrudResult<User> {
        let hashed = hash(new_password)?;
        self.db.update(id, json!({ "password": hashed }), ctx).await
    }

    pub async fn set_activated(&self, id: &Uuid, activated: bool, ctx: &CallContext) -> CrudResult<User> {
        self.db.update(id, json!({ "activated": activated }), ctx).await
    }

    pub async fn remove(&self, id: &Uuid, ctx: &CallContext) -> CrudResult<User> {
        self.db.remove(id, ctx).await
    }
}
