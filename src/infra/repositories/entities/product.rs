//! Product database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use crate::domain::{Category, Product};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    pub category: String,
    pub available: bool,
    pub is_rented: bool,
    pub total_rentals: i32,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_revenue: Decimal,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Product {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let category = Category::parse(&model.category)
            .map_err(|_| AppError::internal(format!("Product {} has unknown category", model.id)))?;

        Ok(Product {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            description: model.description,
            price: model.price,
            category,
            available: model.available,
            is_rented: model.is_rented,
            total_rentals: model.total_rentals,
            total_revenue: model.total_revenue,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        })
    }
}

impl From<&Product> for ActiveModel {
    fn from(product: &Product) -> Self {
        ActiveModel {
            id: Set(product.id),
            owner_id: Set(product.owner_id),
            name: Set(product.name.clone()),
            description: Set(product.description.clone()),
            price: Set(product.price),
            category: Set(product.category.as_str().to_string()),
            available: Set(product.available),
            is_rented: Set(product.is_rented),
            total_rentals: Set(product.total_rentals),
            total_revenue: Set(product.total_revenue),
            version: Set(product.version),
            created_at: Set(product.created_at),
            updated_at: Set(product.updated_at),
            deleted_at: Set(product.deleted_at),
        }
    }
}
