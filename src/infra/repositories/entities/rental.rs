//! Rental database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use crate::domain::{Rental, RentalStatus};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rentals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: Date,
    pub end_date: Date,
    pub status: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_price: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
    pub reviewed: bool,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Rental {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = RentalStatus::parse(&model.status)
            .map_err(|_| AppError::internal(format!("Rental {} has unknown status", model.id)))?;

        Ok(Rental {
            id: model.id,
            product_id: model.product_id,
            renter_id: model.renter_id,
            owner_id: model.owner_id,
            start_date: model.start_date,
            end_date: model.end_date,
            status,
            total_price: model.total_price,
            message: model.message,
            reviewed: model.reviewed,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Rental> for ActiveModel {
    fn from(rental: &Rental) -> Self {
        ActiveModel {
            id: Set(rental.id),
            product_id: Set(rental.product_id),
            renter_id: Set(rental.renter_id),
            owner_id: Set(rental.owner_id),
            start_date: Set(rental.start_date),
            end_date: Set(rental.end_date),
            status: Set(rental.status.as_str().to_string()),
            total_price: Set(rental.total_price),
            message: Set(rental.message.clone()),
            reviewed: Set(rental.reviewed),
            version: Set(rental.version),
            created_at: Set(rental.created_at),
            updated_at: Set(rental.updated_at),
        }
    }
}
