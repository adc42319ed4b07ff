use crate::core::error::{CrudResult, ValidationError};
use crate::entities::Product;
use crate::mixin::{CallContext, DbService};
use crate::services::query_by;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Catalogue, unique by product name
#[derive(Debug, Clone)]
pub struct ProductService {
    db: Arc<DbService<Product>>,
}

impl ProductService {
    pub fn new(db: Arc<DbService<Product>>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<DbService<Product>> {
        &self.db
    }

    pub async fn create(&self, product: Product, ctx: &CallContext) -> CrudResult<Product> {
        self.db.create(product, ctx).await
    }

    pub async fn list(&self) -> CrudResult<Vec<Product>> {
        self.db.list().await
    }

    pub async fn find_by_name(&self, name: &str) -> CrudResult<Option<Product>> {
        self.db.find_one(&query_by("name", name)).await
    }

    /// Products not explicitly deactivated
    pub async fn list_active(&self) -> CrudResult<Vec<Product>> {
        Ok(self
            .db
            .list()
            .await?
            .into_iter()
            .filter(Product::is_active)
            .collect())
    }

    /// Add `delta` to the stock; the result may not go below zero
    pub async fn adjust_quantity(&self, id: &Uuid, delta: i64, ctx: &CallContext) -> CrudResult<Product> {
        let product = self.db.get(id).await?;
        let quantity = product.quantity.unwrap_or(0) + delta;
        if quantity < 0 {
            return Err(ValidationError::FieldError {
                field: "quantity".to_string(),
                message: format!("stock would drop to {}", quantity),
            }
            .into());
        }
        self.db.update(id, json!({ "quantity": quantity }), ctx).await
    }
}
