//! Review service - One review per returned rental.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Actor, RatingSummary, RentalStatus, Review};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReviewService: Send + Sync {
    /// Record the renter's review of a returned rental
    async fn submit(
        &self,
        actor: Actor,
        rental_id: Uuid,
        rating: i16,
        comment: String,
    ) -> AppResult<Review>;

    /// Reviews of a product, newest first
    async fn list_for_product(&self, product_id: Uuid) -> AppResult<Vec<Review>>;

    async fn rating_summary(&self, product_id: Uuid) -> AppResult<RatingSummary>;
}

pub struct ReviewManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> ReviewManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> ReviewService for ReviewManager<U> {
    async fn submit(
        &self,
        actor: Actor,
        rental_id: Uuid,
        rating: i16,
        comment: String,
    ) -> AppResult<Review> {
        let review = with_transaction!(self.uow, |tx| {
            let mut rental = tx.find_rental(rental_id).await?.ok_or(AppError::NotFound)?;

            if rental.renter_id != actor.id {
                return Err(AppError::not_eligible("Only the renter can review a rental"));
            }
            if rental.status != RentalStatus::Returned {
                return Err(AppError::not_eligible(
                    "Only returned rentals can be reviewed",
                ));
            }
            if rental.reviewed {
                return Err(AppError::AlreadyReviewed);
            }

            let review = Review::new(rental.product_id, rental.id, actor.id, rating, &comment)?;
            rental.mark_reviewed();
            tx.update_rental(&rental).await?;
            tx.insert_review(&review).await?;
            Ok(review)
        })?;

        tracing::info!(
            review_id = %review.id,
            rental_id = %review.rental_id,
            rating = review.rating,
            "Review recorded"
        );
        Ok(review)
    }

    async fn list_for_product(&self, product_id: Uuid) -> AppResult<Vec<Review>> {
        self.uow.reviews().list_by_product(product_id).await
    }

    async fn rating_summary(&self, product_id: Uuid) -> AppResult<RatingSummary> {
        let reviews = self.list_for_product(product_id).await?;
        Ok(RatingSummary::from_reviews(&reviews))
    }
}
