//! Router tests over mocked services.
//!
//! Run with `cargo test --features test-utils`.
#![cfg(feature = "test-utils")]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use rentease::api::{create_router, AppState};
use rentease::domain::UserRole;
use rentease::errors::AppError;
use rentease::services::{
    AdminService, AuthService, Identity, MockAdminService, MockAuthService, MockProductService,
    MockRentalService, MockReviewService, MockServiceContainer, MockUserService, ProductService,
    RentalService, ReviewService, UserService,
};

struct Mocks {
    auth: MockAuthService,
    rentals: MockRentalService,
    products: MockProductService,
}

impl Mocks {
    /// Every token resolves to a plain user.
    fn new() -> Self {
        let mut auth = MockAuthService::new();
        auth.expect_authenticate().returning(|_| {
            Ok(Identity {
                id: Uuid::new_v4(),
                email: "user@example.com".into(),
                role: UserRole::User,
                session_id: Uuid::new_v4(),
            })
        });
        Self {
            auth,
            rentals: MockRentalService::new(),
            products: MockProductService::new(),
        }
    }

    fn into_router(self) -> Router {
        let auth: Arc<dyn AuthService> = Arc::new(self.auth);
        let users: Arc<dyn UserService> = Arc::new(MockUserService::new());
        let products: Arc<dyn ProductService> = Arc::new(self.products);
        let rentals: Arc<dyn RentalService> = Arc::new(self.rentals);
        let reviews: Arc<dyn ReviewService> = Arc::new(MockReviewService::new());
        let admin: Arc<dyn AdminService> = Arc::new(MockAdminService::new());

        let mut container = MockServiceContainer::new();
        container.expect_auth().return_const(auth);
        container.expect_users().return_const(users);
        container.expect_products().return_const(products);
        container.expect_rentals().return_const(rentals);
        container.expect_reviews().return_const(reviews);
        container.expect_admin().return_const(admin);

        create_router(AppState::from_container(&container, Vec::new()))
    }
}

async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer any-token")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_lost_race_is_conflict() {
    let mut mocks = Mocks::new();
    mocks
        .rentals
        .expect_approve()
        .times(1)
        .returning(|_, _| Err(AppError::conflict("Rental was modified concurrently, please retry")));

    let uri = format!("/rentals/{}/approve", Uuid::new_v4());
    let (status, body) = call(mocks.into_router(), Method::POST, &uri).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_infrastructure_failure_is_retryable_and_opaque() {
    let mut mocks = Mocks::new();
    mocks.products.expect_get().returning(|_| {
        Err(AppError::Database(sea_orm::DbErr::Conn(
            sea_orm::RuntimeErr::Internal("connection refused to 10.0.0.5".into()),
        )))
    });

    let uri = format!("/products/{}", Uuid::new_v4());
    let (status, body) = call(mocks.into_router(), Method::GET, &uri).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "INFRASTRUCTURE_ERROR");
    assert!(!body.to_string().contains("10.0.0.5"));
}

#[tokio::test]
async fn test_transition_error_names_both_states() {
    let mut mocks = Mocks::new();
    mocks
        .rentals
        .expect_decline()
        .returning(|_, _| Err(AppError::invalid_transition("returned", "declined")));

    let uri = format!("/rentals/{}/decline", Uuid::new_v4());
    let (status, body) = call(mocks.into_router(), Method::POST, &uri).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"]["message"],
        "Cannot move rental from returned to declined"
    );
}

#[tokio::test]
async fn test_plain_user_never_reaches_admin_service() {
    // MockAdminService has no expectations, any call would panic
    let (status, body) = call(Mocks::new().into_router(), Method::GET, "/admin/products").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_health_without_probes_is_healthy() {
    let (status, body) = call(Mocks::new().into_router(), Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
