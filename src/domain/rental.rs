//! Rental entity and its lifecycle state machine.
//!
//! ```text
//! pending ──approve──▶ approved ──return──▶ returned
//!    │
//!    └──decline──▶ declined
//! ```
//!
//! `declined` and `returned` are terminal.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Rental status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Approved,
    Declined,
    Returned,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Pending => "pending",
            RentalStatus::Approved => "approved",
            RentalStatus::Declined => "declined",
            RentalStatus::Returned => "returned",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "pending" => Ok(RentalStatus::Pending),
            "approved" => Ok(RentalStatus::Approved),
            "declined" | "rejected" => Ok(RentalStatus::Declined),
            "returned" | "completed" => Ok(RentalStatus::Returned),
            other => Err(AppError::validation(format!("Unknown rental status '{}'", other))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Declined | RentalStatus::Returned)
    }

    /// Pending or approved rentals still hold a claim on the product.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// Edges of the lifecycle graph.
    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        matches!(
            (self, next),
            (RentalStatus::Pending, RentalStatus::Approved)
                | (RentalStatus::Pending, RentalStatus::Declined)
                | (RentalStatus::Approved, RentalStatus::Returned)
        )
    }
}

impl std::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of asking a rental to move to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status changed; side effects must be applied.
    Applied,
    /// The rental was already in the requested status.
    Unchanged,
}

/// A request to rent a product over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Rental {
    pub id: Uuid,
    pub product_id: Uuid,
    pub renter_id: Uuid,
    /// Denormalized from the product at request time
    pub owner_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2024-01-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-01-04")]
    pub end_date: NaiveDate,
    pub status: RentalStatus,
    #[schema(value_type = String, example = "60.00")]
    pub total_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub reviewed: bool,
    /// Optimistic concurrency token, bumped on every write
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Number of billable days between two calendar dates.
///
/// # Errors
/// `Validation` unless `end` is strictly after `start`.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> AppResult<i64> {
    let days = (end - start).num_days();
    if days <= 0 {
        return Err(AppError::validation("End date must be after start date"));
    }
    Ok(days)
}

/// `days × daily price`, always derived server-side.
pub fn total_price(start: NaiveDate, end: NaiveDate, daily_price: Decimal) -> AppResult<Decimal> {
    Ok(Decimal::from(rental_days(start, end)?) * daily_price)
}

impl Rental {
    /// Create a pending request. Pricing uses the product's current rate.
    pub fn request(
        product_id: Uuid,
        owner_id: Uuid,
        renter_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        daily_price: Decimal,
        message: Option<String>,
    ) -> AppResult<Self> {
        let total_price = total_price(start_date, end_date, daily_price)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            renter_id,
            owner_id,
            start_date,
            end_date,
            status: RentalStatus::Pending,
            total_price,
            message: message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            reviewed: false,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn days(&self) -> AppResult<i64> {
        rental_days(self.start_date, self.end_date)
    }

    /// Move to `next` if the lifecycle allows it.
    ///
    /// Asking for the current status is a no-op. Terminal rentals refuse
    /// everything else with `InvalidStateTransition`.
    pub fn transition(&mut self, next: RentalStatus) -> AppResult<Transition> {
        if self.status == next {
            return Ok(Transition::Unchanged);
        }
        if !self.status.can_transition_to(next) {
            return Err(AppError::invalid_transition(self.status, next));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(Transition::Applied)
    }

    /// Re-derive the price from the dates and the product's daily rate.
    pub fn reprice(&mut self, daily_price: Decimal) -> AppResult<Decimal> {
        self.total_price = total_price(self.start_date, self.end_date, daily_price)?;
        Ok(self.total_price)
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.renter_id == user_id || self.owner_id == user_id
    }

    pub fn mark_reviewed(&mut self) {
        self.reviewed = true;
        self.updated_at = Utc::now();
    }
}
