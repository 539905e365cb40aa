//! Product handlers: public browsing and owner-side listing management.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{Category, NewProduct, Product, ProductPatch, RatingSummary, Review};
use crate::errors::AppResult;
use crate::infra::{ProductFilter, ProductSort};
use crate::types::{Created, NoContent, Paginated, PaginationParams, ProductPage};

/// Browse filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub category: Option<Category>,
    /// Only listings that can be requested right now
    #[serde(default)]
    pub available_only: bool,
    pub owner_id: Option<Uuid>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
    /// `newest` (default), `oldest`, `price_asc` or `price_desc`
    #[serde(default)]
    pub sort: ProductSort,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        Self {
            category: query.category,
            available_only: query.available_only,
            owner_id: query.owner_id,
            search: query.search,
            sort: query.sort,
        }
    }
}

/// New listing
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    #[schema(example = "Cordless drill")]
    pub name: String,
    #[validate(length(max = 2000, message = "Description is too long"))]
    #[serde(default)]
    pub description: String,
    /// Price per day, must be positive
    #[schema(value_type = String, example = "20.00")]
    pub price: Decimal,
    pub category: Category,
    #[serde(default = "listed_available")]
    pub available: bool,
}

fn listed_available() -> bool {
    true
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            price: req.price,
            category: req.category,
            available: req.available,
        }
    }
}

/// Partial listing update; omitted fields stay unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
    #[schema(value_type = Option<String>, example = "25.00")]
    pub price: Option<Decimal>,
    pub category: Option<Category>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            price: req.price,
            category: req.category,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AvailabilityRequest {
    pub available: bool,
}

/// Reviews of a product with their aggregate
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductReviews {
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
}

/// Public browsing routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id/reviews", get(list_product_reviews))
}

/// Listing management routes (auth required)
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_products).post(create_product))
        .route("/:id", put(update_product).delete(delete_product))
        .route("/:id/availability", put(set_availability))
}

/// Browse active listings, newest first
#[utoipa::path(
    get,
    path = "/products",
    tag = "Products",
    params(ProductQuery, PaginationParams),
    responses(
        (status = 200, description = "Page of listings", body = ProductPage)
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<Paginated<Product>>> {
    let products = state.product_service.search(query.into(), page).await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Listing", body = Product),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let product = state.product_service.get(id).await?;
    Ok(Json(product))
}

#[utoipa::path(
    get,
    path = "/products/{id}/reviews",
    tag = "Products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reviews, newest first", body = ProductReviews)
    )
)]
pub async fn list_product_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductReviews>> {
    let reviews = state.review_service.list_for_product(id).await?;
    Ok(Json(ProductReviews {
        summary: RatingSummary::from_reviews(&reviews),
        reviews,
    }))
}

/// The caller's active listings
#[utoipa::path(
    get,
    path = "/listings",
    tag = "Listings",
    responses(
        (status = 200, description = "Own listings", body = Vec<Product>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_products(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<Product>>> {
    let products = state.product_service.list_by_owner(current_user.id).await?;
    Ok(Json(products))
}

/// List a product; a first listing makes the caller an owner
#[utoipa::path(
    post,
    path = "/listings",
    tag = "Listings",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Listing created", body = Product),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> AppResult<Created<Product>> {
    let product = state
        .product_service
        .create(current_user.actor(), payload.into())
        .await?;
    Ok(Created(product))
}

#[utoipa::path(
    put,
    path = "/listings/{id}",
    tag = "Listings",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Listing updated", body = Product),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Concurrent modification")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> AppResult<Json<Product>> {
    let product = state
        .product_service
        .update(current_user.actor(), id, payload.into())
        .await?;
    Ok(Json(product))
}

/// Open or close a listing for new requests
#[utoipa::path(
    put,
    path = "/listings/{id}/availability",
    tag = "Listings",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability changed", body = Product),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_availability(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AvailabilityRequest>,
) -> AppResult<Json<Product>> {
    let product = state
        .product_service
        .set_availability(current_user.actor(), id, payload.available)
        .await?;
    Ok(Json(product))
}

/// Soft delete a listing without pending or approved rentals
#[utoipa::path(
    delete,
    path = "/listings/{id}",
    tag = "Listings",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Listing has open rentals")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .product_service
        .delete(current_user.actor(), id)
        .await?;
    Ok(NoContent)
}
