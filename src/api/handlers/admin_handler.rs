//! Admin panel handlers.
//!
//! Privilege changes and user deletion are two-step: a challenge is issued
//! for the caller's login session and completed with password and code.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
    Extension, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{AdminAction, Product, UserResponse};
use crate::errors::AppResult;
use crate::services::{ConfirmationChallenge, ConfirmationOutcome};
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BeginConfirmationRequest {
    pub action: AdminAction,
    pub target_user_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompleteConfirmationRequest {
    /// The admin's own password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Code from the challenge, case-sensitive
    #[validate(length(min = 1, message = "Code is required"))]
    #[schema(example = "aB3xY9")]
    pub code: String,
}

/// Create admin routes (auth + admin required)
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/products", get(list_products))
        .route("/products/:id", delete(delete_product))
        .route(
            "/confirmations",
            post(begin_confirmation).delete(cancel_confirmation),
        )
        .route("/confirmations/complete", post(complete_confirmation))
}

/// All users, soft-deleted included
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.admin_service.list_users(current_user.actor()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// All products, soft-deleted included
#[utoipa::path(
    get,
    path = "/admin/products",
    tag = "Admin",
    responses(
        (status = 200, description = "All products", body = Vec<Product>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<Product>>> {
    let products = state
        .admin_service
        .list_products(current_user.actor())
        .await?;
    Ok(Json(products))
}

#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product has open rentals")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .admin_service
        .delete_product(current_user.actor(), id)
        .await?;
    Ok(NoContent)
}

/// Start a confirmation; replaces any pending one in this session
#[utoipa::path(
    post,
    path = "/admin/confirmations",
    tag = "Admin",
    request_body = BeginConfirmationRequest,
    responses(
        (status = 201, description = "Challenge issued", body = ConfirmationChallenge),
        (status = 400, description = "Action not allowed on this user"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn begin_confirmation(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<BeginConfirmationRequest>,
) -> AppResult<Created<ConfirmationChallenge>> {
    let challenge = state
        .admin_service
        .begin_confirmation(
            current_user.actor(),
            current_user.session_id,
            payload.action,
            payload.target_user_id,
        )
        .await?;
    Ok(Created(challenge))
}

/// Re-authenticate and run the pending action
#[utoipa::path(
    post,
    path = "/admin/confirmations/complete",
    tag = "Admin",
    request_body = CompleteConfirmationRequest,
    responses(
        (status = 200, description = "Action executed", body = ConfirmationOutcome),
        (status = 400, description = "No pending action, or wrong password or code")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_confirmation(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CompleteConfirmationRequest>,
) -> AppResult<Json<ConfirmationOutcome>> {
    let outcome = state
        .admin_service
        .complete_confirmation(
            current_user.actor(),
            current_user.session_id,
            payload.password,
            payload.code,
        )
        .await?;
    Ok(Json(outcome))
}

/// Dismiss the pending action
#[utoipa::path(
    delete,
    path = "/admin/confirmations",
    tag = "Admin",
    responses((status = 204, description = "Pending action discarded")),
    security(("bearer_auth" = []))
)]
pub async fn cancel_confirmation(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<NoContent> {
    state
        .admin_service
        .cancel_confirmation(current_user.actor(), current_user.session_id)
        .await?;
    Ok(NoContent)
}
