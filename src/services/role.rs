use crate::core::error::CrudResult;
use crate::entities::{Role, RoleTag};
use crate::mixin::{CallContext, DbService};
use crate::services::query_by;
use std::sync::Arc;

/// Roles, unique by name
#[derive(Debug, Clone)]
pub struct RoleService {
    db: Arc<DbService<Role>>,
}

impl RoleService {
    pub fn new(db: Arc<DbService<Role>>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<DbService<Role>> {
        &self.db
    }

    pub async fn create(&self, role: Role, ctx: &CallContext) -> CrudResult<Role> {
        self.db.create(role, ctx).await
    }

    pub async fn list(&self) -> CrudResult<Vec<Role>> {
        self.db.list().await
    }

    pub async fn find_by_name(&self, name: RoleTag) -> CrudResult<Option<Role>> {
        self.db.find_one(&query_by("name", name.as_str())).await
    }
}
