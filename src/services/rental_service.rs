//! Rental service - The rental lifecycle and its product side effects.
//!
//! Every transition runs in one Unit-of-Work transaction. Product and rental
//! writes are conditional on the versions read inside it, so of two racing
//! approvals only one can flip `is_rented`. A request also bumps the
//! product version, which makes it conflict with a concurrent delete.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Actor, Rental, RentalStatus, Transition};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A renter's request for a date range
#[derive(Debug, Clone)]
pub struct NewRental {
    pub product_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub message: Option<String>,
}

/// Figures for an owner's dashboard
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OwnerSummary {
    pub product_count: usize,
    pub pending_requests: usize,
    pub active_rentals: usize,
    pub total_rentals: i64,
    #[schema(value_type = String, example = "240.00")]
    pub total_revenue: Decimal,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RentalService: Send + Sync {
    /// Create a pending rental priced from the product's current rate
    async fn request(&self, actor: Actor, request: NewRental) -> AppResult<Rental>;

    /// Visible to the renter, the owner and admins
    async fn get(&self, actor: Actor, id: Uuid) -> AppResult<Rental>;

    async fn list_for_renter(&self, renter_id: Uuid) -> AppResult<Vec<Rental>>;

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        status: Option<RentalStatus>,
    ) -> AppResult<Vec<Rental>>;

    /// `pending → approved`, marks the product rented
    async fn approve(&self, actor: Actor, id: Uuid) -> AppResult<Rental>;

    /// `pending → declined`
    async fn decline(&self, actor: Actor, id: Uuid) -> AppResult<Rental>;

    /// `approved → returned`, folds the rental into the product aggregates
    async fn mark_returned(&self, actor: Actor, id: Uuid) -> AppResult<Rental>;

    async fn owner_summary(&self, owner_id: Uuid) -> AppResult<OwnerSummary>;
}

pub struct RentalManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> RentalManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> RentalService for RentalManager<U> {
    async fn request(&self, actor: Actor, request: NewRental) -> AppResult<Rental> {
        let rental = with_transaction!(self.uow, |tx| {
            let product = tx
                .find_product(request.product_id)
                .await?
                .ok_or(AppError::NotFound)?;

            if product.owner_id == actor.id {
                return Err(AppError::validation("You cannot rent your own product"));
            }
            if !product.available {
                return Err(AppError::validation("Product is not available for rent"));
            }
            if product.is_rented {
                return Err(AppError::validation("Product is currently rented out"));
            }

            let rental = Rental::request(
                product.id,
                product.owner_id,
                actor.id,
                request.start_date,
                request.end_date,
                product.price,
                request.message,
            )?;
            // Version bump so a concurrent delete of the product conflicts
            tx.update_product(&product).await?;
            tx.insert_rental(&rental).await?;
            Ok(rental)
        })?;

        tracing::info!(
            rental_id = %rental.id,
            product_id = %rental.product_id,
            renter_id = %rental.renter_id,
            total_price = %rental.total_price,
            "Rental requested"
        );
        Ok(rental)
    }

    async fn get(&self, actor: Actor, id: Uuid) -> AppResult<Rental> {
        let rental = self.uow.rentals().find_by_id(id).await?.ok_or_not_found()?;
        if !rental.involves(actor.id) && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(rental)
    }

    async fn list_for_renter(&self, renter_id: Uuid) -> AppResult<Vec<Rental>> {
        self.uow.rentals().list_by_renter(renter_id).await
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        status: Option<RentalStatus>,
    ) -> AppResult<Vec<Rental>> {
        self.uow.rentals().list_by_owner(owner_id, status).await
    }

    async fn approve(&self, actor: Actor, id: Uuid) -> AppResult<Rental> {
        let rental = with_transaction!(self.uow, |tx| {
            let mut rental = tx.find_rental(id).await?.ok_or(AppError::NotFound)?;
            if !actor.can_manage(rental.owner_id) {
                return Err(AppError::Forbidden);
            }
            if rental.transition(RentalStatus::Approved)? == Transition::Unchanged {
                return Ok(rental);
            }

            let mut product = tx
                .find_product(rental.product_id)
                .await?
                .ok_or_else(|| AppError::conflict("Product is no longer available for rent"))?;
            product.mark_rented()?;
            rental.reprice(product.price)?;

            tx.update_product(&product).await?;
            tx.update_rental(&rental).await
        })?;

        tracing::info!(rental_id = %rental.id, status = %rental.status, "Rental approved");
        Ok(rental)
    }

    async fn decline(&self, actor: Actor, id: Uuid) -> AppResult<Rental> {
        let rental = with_transaction!(self.uow, |tx| {
            let mut rental = tx.find_rental(id).await?.ok_or(AppError::NotFound)?;
            if !actor.can_manage(rental.owner_id) {
                return Err(AppError::Forbidden);
            }
            match rental.transition(RentalStatus::Declined)? {
                Transition::Unchanged => Ok(rental),
                Transition::Applied => tx.update_rental(&rental).await,
            }
        })?;

        tracing::info!(rental_id = %rental.id, status = %rental.status, "Rental declined");
        Ok(rental)
    }

    async fn mark_returned(&self, actor: Actor, id: Uuid) -> AppResult<Rental> {
        let rental = with_transaction!(self.uow, |tx| {
            let mut rental = tx.find_rental(id).await?.ok_or(AppError::NotFound)?;
            if !actor.can_manage(rental.owner_id) {
                return Err(AppError::Forbidden);
            }
            if rental.transition(RentalStatus::Returned)? == Transition::Unchanged {
                return Ok(rental);
            }

            // Deletion is blocked while approved, so the product is still there
            let mut product = tx
                .find_product(rental.product_id)
                .await?
                .ok_or_else(|| AppError::internal("Approved rental lost its product"))?;
            let price = rental.reprice(product.price)?;
            product.record_return(price);

            tx.update_product(&product).await?;
            tx.update_rental(&rental).await
        })?;

        tracing::info!(
            rental_id = %rental.id,
            total_price = %rental.total_price,
            "Rental returned"
        );
        Ok(rental)
    }

    async fn owner_summary(&self, owner_id: Uuid) -> AppResult<OwnerSummary> {
        let products = self.uow.products();
        let rentals = self.uow.rentals();
        let (products, rentals) = tokio::try_join!(
            products.list_by_owner(owner_id),
            rentals.list_by_owner(owner_id, None),
        )?;

        let count = |status: RentalStatus| rentals.iter().filter(|r| r.status == status).count();

        Ok(OwnerSummary {
            product_count: products.len(),
            pending_requests: count(RentalStatus::Pending),
            active_rentals: count(RentalStatus::Approved),
            total_rentals: products.iter().map(|p| i64::from(p.total_rentals)).sum(),
            total_revenue: products.iter().map(|p| p.total_revenue).sum(),
        })
    }
}
