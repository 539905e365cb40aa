//! Reviews left by renters after a completed rental.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{MAX_RATING, MIN_RATING};
use crate::errors::{AppError, AppResult};

/// Immutable rating and comment for one rental.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub rental_id: Uuid,
    pub reviewer_id: Uuid,
    #[schema(minimum = 1, maximum = 5, example = 5)]
    pub rating: i16,
    #[schema(example = "Worked perfectly, friendly owner")]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        product_id: Uuid,
        rental_id: Uuid,
        reviewer_id: Uuid,
        rating: i16,
        comment: &str,
    ) -> AppResult<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(AppError::validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(AppError::validation("Comment is required"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            rental_id,
            reviewer_id,
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Aggregate rating for a product
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RatingSummary {
    pub count: usize,
    /// Mean rating rounded to one decimal, absent without reviews
    #[schema(example = 4.5)]
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        if reviews.is_empty() {
            return Self {
                count: 0,
                average: None,
            };
        }
        let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
        let mean = sum as f64 / reviews.len() as f64;
        Self {
            count: reviews.len(),
            average: Some((mean * 10.0).round() / 10.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i16) -> Review {
        Review::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), rating, "ok").unwrap()
    }

    #[test]
    fn test_rating_bounds() {
        let ids = || (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (p, r, u) = ids();
        assert!(Review::new(p, r, u, 0, "fine").is_err());
        assert!(Review::new(p, r, u, 6, "fine").is_err());
        assert!(Review::new(p, r, u, 1, "fine").is_ok());
        assert!(Review::new(p, r, u, 5, "fine").is_ok());
    }

    #[test]
    fn test_blank_comment_rejected() {
        let result = Review::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 4, "   ");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_summary_rounds_to_one_decimal() {
        let summary = RatingSummary::from_reviews(&[review(5), review(4), review(4)]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.3));

        assert_eq!(RatingSummary::from_reviews(&[]).average, None);
    }
}
