//! Rental lifecycle handlers, reviews and the owner dashboard.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{Rental, RentalStatus, Review};
use crate::errors::AppResult;
use crate::services::{NewRental, OwnerSummary};
use crate::types::Created;

/// Rental request for a date range
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RentalRequest {
    pub product_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2024-06-01")]
    pub start_date: NaiveDate,
    /// Must be after `start_date`
    #[schema(value_type = String, format = Date, example = "2024-06-04")]
    pub end_date: NaiveDate,
    /// Note for the owner
    #[validate(length(max = 2000, message = "Message is too long"))]
    pub message: Option<String>,
}

impl From<RentalRequest> for NewRental {
    fn from(req: RentalRequest) -> Self {
        Self {
            product_id: req.product_id,
            start_date: req.start_date,
            end_date: req.end_date,
            message: req.message,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IncomingQuery {
    pub status: Option<RentalStatus>,
}

/// Review of a returned rental
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    #[schema(minimum = 1, maximum = 5, example = 5)]
    pub rating: i16,
    #[validate(length(min = 1, max = 2000, message = "Comment is required"))]
    #[schema(example = "Worked perfectly")]
    pub comment: String,
}

/// Rental routes (auth required)
pub fn rental_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(request_rental))
        .route("/mine", get(list_my_rentals))
        .route("/incoming", get(list_incoming_rentals))
        .route("/:id", get(get_rental))
        .route("/:id/approve", post(approve_rental))
        .route("/:id/decline", post(decline_rental))
        .route("/:id/return", post(return_rental))
        .route("/:id/review", post(review_rental))
}

/// Owner dashboard routes (auth required)
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/summary", get(owner_summary))
}

/// Request a rental; the price is computed from the product's daily rate
#[utoipa::path(
    post,
    path = "/rentals",
    tag = "Rentals",
    request_body = RentalRequest,
    responses(
        (status = 201, description = "Pending rental created", body = Rental),
        (status = 400, description = "Product cannot be rented for these dates"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn request_rental(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<RentalRequest>,
) -> AppResult<Created<Rental>> {
    let rental = state
        .rental_service
        .request(current_user.actor(), payload.into())
        .await?;
    Ok(Created(rental))
}

/// Rentals the caller requested, newest first
#[utoipa::path(
    get,
    path = "/rentals/mine",
    tag = "Rentals",
    responses((status = 200, description = "Own rentals", body = Vec<Rental>)),
    security(("bearer_auth" = []))
)]
pub async fn list_my_rentals(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<Rental>>> {
    let rentals = state.rental_service.list_for_renter(current_user.id).await?;
    Ok(Json(rentals))
}

/// Requests for the caller's products, newest first
#[utoipa::path(
    get,
    path = "/rentals/incoming",
    tag = "Rentals",
    params(IncomingQuery),
    responses((status = 200, description = "Incoming rentals", body = Vec<Rental>)),
    security(("bearer_auth" = []))
)]
pub async fn list_incoming_rentals(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<IncomingQuery>,
) -> AppResult<Json<Vec<Rental>>> {
    let rentals = state
        .rental_service
        .list_for_owner(current_user.id, query.status)
        .await?;
    Ok(Json(rentals))
}

#[utoipa::path(
    get,
    path = "/rentals/{id}",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental", body = Rental),
        (status = 403, description = "Not a party to the rental"),
        (status = 404, description = "Rental not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_rental(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Rental>> {
    let rental = state.rental_service.get(current_user.actor(), id).await?;
    Ok(Json(rental))
}

/// `pending → approved`
#[utoipa::path(
    post,
    path = "/rentals/{id}/approve",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental approved", body = Rental),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Invalid transition or product already rented")
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_rental(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Rental>> {
    let rental = state.rental_service.approve(current_user.actor(), id).await?;
    Ok(Json(rental))
}

/// `pending → declined`
#[utoipa::path(
    post,
    path = "/rentals/{id}/decline",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental declined", body = Rental),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Invalid transition")
    ),
    security(("bearer_auth" = []))
)]
pub async fn decline_rental(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Rental>> {
    let rental = state.rental_service.decline(current_user.actor(), id).await?;
    Ok(Json(rental))
}

/// `approved → returned`
#[utoipa::path(
    post,
    path = "/rentals/{id}/return",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental returned", body = Rental),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Invalid transition")
    ),
    security(("bearer_auth" = []))
)]
pub async fn return_rental(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Rental>> {
    let rental = state
        .rental_service
        .mark_returned(current_user.actor(), id)
        .await?;
    Ok(Json(rental))
}

/// Review a returned rental, once
#[utoipa::path(
    post,
    path = "/rentals/{id}/review",
    tag = "Rentals",
    params(("id" = Uuid, Path, description = "Rental ID")),
    request_body = ReviewRequest,
    responses(
        (status = 201, description = "Review recorded", body = Review),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not eligible to review"),
        (status = 409, description = "Already reviewed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn review_rental(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ReviewRequest>,
) -> AppResult<Created<Review>> {
    let review = state
        .review_service
        .submit(current_user.actor(), id, payload.rating, payload.comment)
        .await?;
    Ok(Created(review))
}

/// Figures across the caller's products
#[utoipa::path(
    get,
    path = "/dashboard/summary",
    tag = "Rentals",
    responses((status = 200, description = "Owner summary", body = OwnerSummary)),
    security(("bearer_auth" = []))
)]
pub async fn owner_summary(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<OwnerSummary>> {
    let summary = state.rental_service.owner_summary(current_user.id).await?;
    Ok(Json(summary))
}
