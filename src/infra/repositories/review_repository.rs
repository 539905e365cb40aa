//! Review repository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::entities::review::{self, Entity as ReviewEntity};
use crate::domain::Review;
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Reviews of one product, newest first
    async fn list_by_product(&self, product_id: Uuid) -> AppResult<Vec<Review>>;
}

pub struct ReviewStore {
    db: DatabaseConnection,
}

impl ReviewStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReviewRepository for ReviewStore {
    async fn list_by_product(&self, product_id: Uuid) -> AppResult<Vec<Review>> {
        let models = ReviewEntity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Review::from).collect())
    }
}
