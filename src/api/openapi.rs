//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    admin_handler, auth_handler, product_handler, rental_handler, user_handler,
};
use crate::domain::{
    AdminAction, Category, Product, RatingSummary, Rental, RentalStatus, Review, UserResponse,
    UserRole,
};
use crate::infra::ProductSort;
use crate::services::{ConfirmationChallenge, ConfirmationOutcome, OwnerSummary, TokenResponse};
use crate::types::{PaginationMeta, ProductPage};

/// OpenAPI documentation for the RentEase API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "RentEase API",
        version = "0.1.0",
        description = "Peer-to-peer rental marketplace: listings, rental requests, reviews and moderation",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        auth_handler::register,
        auth_handler::login,
        user_handler::get_current_user,
        user_handler::update_current_user,
        product_handler::list_products,
        product_handler::get_product,
        product_handler::list_product_reviews,
        product_handler::list_my_products,
        product_handler::create_product,
        product_handler::update_product,
        product_handler::set_availability,
        product_handler::delete_product,
        rental_handler::request_rental,
        rental_handler::list_my_rentals,
        rental_handler::list_incoming_rentals,
        rental_handler::get_rental,
        rental_handler::approve_rental,
        rental_handler::decline_rental,
        rental_handler::return_rental,
        rental_handler::review_rental,
        rental_handler::owner_summary,
        admin_handler::list_users,
        admin_handler::list_products,
        admin_handler::delete_product,
        admin_handler::begin_confirmation,
        admin_handler::complete_confirmation,
        admin_handler::cancel_confirmation,
    ),
    components(
        schemas(
            // Domain types
            UserRole,
            UserResponse,
            Category,
            Product,
            ProductSort,
            RentalStatus,
            Rental,
            Review,
            RatingSummary,
            AdminAction,
            // Service results
            TokenResponse,
            OwnerSummary,
            ConfirmationChallenge,
            ConfirmationOutcome,
            ProductPage,
            PaginationMeta,
            // Request bodies
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            user_handler::UpdateProfileRequest,
            product_handler::CreateProductRequest,
            product_handler::UpdateProductRequest,
            product_handler::AvailabilityRequest,
            product_handler::ProductReviews,
            rental_handler::RentalRequest,
            rental_handler::ReviewRequest,
            admin_handler::BeginConfirmationRequest,
            admin_handler::CompleteConfirmationRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "User registration and login"),
        (name = "Users", description = "Profile of the signed-in user"),
        (name = "Products", description = "Public browsing of listings"),
        (name = "Listings", description = "Owner-side listing management"),
        (name = "Rentals", description = "Rental requests, lifecycle and reviews"),
        (name = "Admin", description = "Moderation and confirmation-gated account actions")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/products",
            "/listings/{id}",
            "/rentals/{id}/approve",
            "/dashboard/summary",
            "/admin/confirmations/complete",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
