//! Review database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use crate::domain::Review;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(unique)]
    pub rental_id: Uuid,
    pub reviewer_id: Uuid,
    pub rating: i16,
    #[sea_orm(column_type = "Text")]
    pub comment: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rental::Entity",
        from = "Column::RentalId",
        to = "super::rental::Column::Id"
    )]
    Rental,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Review {
    fn from(model: Model) -> Self {
        Review {
            id: model.id,
            product_id: model.product_id,
            rental_id: model.rental_id,
            reviewer_id: model.reviewer_id,
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at,
        }
    }
}

impl From<&Review> for ActiveModel {
    fn from(review: &Review) -> Self {
        ActiveModel {
            id: Set(review.id),
            product_id: Set(review.product_id),
            rental_id: Set(review.rental_id),
            reviewer_id: Set(review.reviewer_id),
            rating: Set(review.rating),
            comment: Set(review.comment.clone()),
            created_at: Set(review.created_at),
        }
    }
}
