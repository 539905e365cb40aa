//! Rental repository: read-side queries. Writes go through a transaction.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::entities::rental::{self, Entity as RentalEntity};
use crate::domain::{Rental, RentalStatus};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RentalRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rental>>;

    /// Rentals requested by a renter, newest first
    async fn list_by_renter(&self, renter_id: Uuid) -> AppResult<Vec<Rental>>;

    /// Rentals of an owner's products, newest first, optionally by status
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        status: Option<RentalStatus>,
    ) -> AppResult<Vec<Rental>>;
}

pub struct RentalStore {
    db: DatabaseConnection,
}

impl RentalStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(models: Vec<rental::Model>) -> AppResult<Vec<Rental>> {
    models.into_iter().map(Rental::try_from).collect()
}

#[async_trait]
impl RentalRepository for RentalStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rental>> {
        RentalEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Rental::try_from)
            .transpose()
    }

    async fn list_by_renter(&self, renter_id: Uuid) -> AppResult<Vec<Rental>> {
        let models = RentalEntity::find()
            .filter(rental::Column::RenterId.eq(renter_id))
            .order_by_desc(rental::Column::CreatedAt)
            .all(&self.db)
            .await?;
        to_domain(models)
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        status: Option<RentalStatus>,
    ) -> AppResult<Vec<Rental>> {
        let mut query = RentalEntity::find()
            .filter(rental::Column::OwnerId.eq(owner_id))
            .order_by_desc(rental::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(rental::Column::Status.eq(status.as_str()));
        }
        to_domain(query.all(&self.db).await?)
    }
}
