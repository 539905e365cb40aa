//! End-to-end tests for the HTTP API.
//!
//! The router runs over the in-process document store, so no PostgreSQL or
//! Redis is needed.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use rentease::api::{create_router, AppState};
use rentease::config::Config;

const PASSWORD: &str = "password123";
const ADMIN_EMAIL: &str = "admin@example.com";

// =============================================================================
// Test Helpers
// =============================================================================

fn app() -> Router {
    let mut config =
        Config::with_secret("integration-test-secret-at-least-32-chars").expect("valid secret");
    config.admin_emails = vec![ADMIN_EMAIL.to_string()];
    create_router(AppState::in_memory(config))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register `email` and return `(user id, bearer token)`.
async fn sign_up(app: &Router, email: &str) -> (String, String) {
    let (status, user) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": PASSWORD, "name": "Tester" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", user);
    let token = log_in(app, email).await;
    (user["id"].as_str().unwrap().to_string(), token)
}

async fn log_in(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["access_token"].as_str().unwrap().to_string()
}

async fn list_product(app: &Router, token: &str, price: &str) -> String {
    let (status, product) = send(
        app,
        Method::POST,
        "/listings",
        Some(token),
        Some(json!({
            "name": "Cordless drill",
            "description": "Two batteries included",
            "price": price,
            "category": "tools-equipment"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", product);
    product["id"].as_str().unwrap().to_string()
}

async fn request_rental(app: &Router, token: &str, product_id: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/rentals",
        Some(token),
        Some(json!({
            "product_id": product_id,
            "start_date": "2024-06-01",
            "end_date": "2024-06-04",
            "message": "Weekend project"
        })),
    )
    .await
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

// =============================================================================
// Health & Auth
// =============================================================================

#[tokio::test]
async fn test_health_reports_document_store() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["document_store"]["status"], "healthy");
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = app();
    let (id, token) = sign_up(&app, "Jane@Example.com").await;

    let (status, me) = send(&app, Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.as_str());
    assert_eq!(me["email"], "jane@example.com");
    assert_eq!(me["role"], "user");
    assert!(me.get("password_hash").is_none());

    let (status, me) = send(
        &app,
        Method::PUT,
        "/users/me",
        Some(&token),
        Some(json!({ "name": "Jane R." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Jane R.");
}

#[tokio::test]
async fn test_duplicate_email_and_bad_login() {
    let app = app();
    sign_up(&app, "dup@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "DUP@example.com", "password": PASSWORD, "name": "Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "dup@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let app = app();
    for uri in ["/users/me", "/listings", "/rentals/mine", "/admin/users"] {
        let (status, _) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let (status, _) = send(&app, Method::GET, "/users/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Listings & Rentals
// =============================================================================

#[tokio::test]
async fn test_rental_lifecycle_end_to_end() {
    let app = app();
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, renter) = sign_up(&app, "renter@example.com").await;
    let product_id = list_product(&app, &owner, "20.00").await;

    // First listing promotes to owner
    let (_, me) = send(&app, Method::GET, "/users/me", Some(&owner), None).await;
    assert_eq!(me["role"], "owner");

    let (status, rental) = request_rental(&app, &renter, &product_id).await;
    assert_eq!(status, StatusCode::CREATED, "{}", rental);
    assert_eq!(rental["status"], "pending");
    assert_eq!(decimal(&rental["total_price"]), Decimal::from(60));
    let rental_id = rental["id"].as_str().unwrap().to_string();

    // The renter cannot approve their own request
    let approve = format!("/rentals/{}/approve", rental_id);
    let (status, _) = send(&app, Method::POST, &approve, Some(&renter), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, rental) = send(&app, Method::POST, &approve, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rental["status"], "approved");

    let (_, product) = send(&app, Method::GET, &format!("/products/{}", product_id), None, None).await;
    assert_eq!(product["is_rented"], true);

    let (status, rental) = send(
        &app,
        Method::POST,
        &format!("/rentals/{}/return", rental_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rental["status"], "returned");

    let (_, product) = send(&app, Method::GET, &format!("/products/{}", product_id), None, None).await;
    assert_eq!(product["is_rented"], false);
    assert_eq!(product["total_rentals"], 1);
    assert_eq!(decimal(&product["total_revenue"]), Decimal::from(60));

    // Terminal state
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/rentals/{}/decline", rental_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE_TRANSITION");

    let (status, summary) = send(&app, Method::GET, "/dashboard/summary", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["product_count"], 1);
    assert_eq!(summary["total_rentals"], 1);
    assert_eq!(decimal(&summary["total_revenue"]), Decimal::from(60));
}

#[tokio::test]
async fn test_review_once_after_return() {
    let app = app();
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, renter) = sign_up(&app, "renter@example.com").await;
    let product_id = list_product(&app, &owner, "15").await;
    let (_, rental) = request_rental(&app, &renter, &product_id).await;
    let rental_id = rental["id"].as_str().unwrap().to_string();
    let review_uri = format!("/rentals/{}/review", rental_id);
    let review = json!({ "rating": 4, "comment": "Solid drill" });

    // Not returned yet
    let (status, body) = send(&app, Method::POST, &review_uri, Some(&renter), Some(review.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "NOT_ELIGIBLE");

    for step in ["approve", "return"] {
        let uri = format!("/rentals/{}/{}", rental_id, step);
        let (status, _) = send(&app, Method::POST, &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        Method::POST,
        &review_uri,
        Some(&renter),
        Some(json!({ "rating": 7, "comment": "Too good" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, Method::POST, &review_uri, Some(&renter), Some(review.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, &review_uri, Some(&renter), Some(review)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_REVIEWED");

    let (status, reviews) = send(
        &app,
        Method::GET,
        &format!("/products/{}/reviews", product_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews["summary"]["count"], 1);
    assert_eq!(reviews["summary"]["average"], 4.0);
    assert_eq!(reviews["reviews"][0]["comment"], "Solid drill");
}

#[tokio::test]
async fn test_request_preconditions() {
    let app = app();
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, renter) = sign_up(&app, "renter@example.com").await;
    let product_id = list_product(&app, &owner, "10").await;

    let (status, _) = request_rental(&app, &owner, &product_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/rentals",
        Some(&renter),
        Some(json!({
            "product_id": product_id,
            "start_date": "2024-06-04",
            "end_date": "2024-06-04"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/listings/{}/availability", product_id),
        Some(&owner),
        Some(json!({ "available": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request_rental(&app, &renter, &product_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = "00000000-0000-0000-0000-000000000000";
    let (status, _) = request_rental(&app, &renter, missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_browse_filters_and_delete_restriction() {
    let app = app();
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, renter) = sign_up(&app, "renter@example.com").await;
    let drill = list_product(&app, &owner, "20").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/listings",
        Some(&owner),
        Some(json!({
            "name": "Party tent",
            "price": "45.50",
            "category": "party-events"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = send(&app, Method::GET, "/products?category=party-events", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 1);
    assert_eq!(page["data"][0]["name"], "Party tent");

    let (_, page) = send(&app, Method::GET, "/products?search=DRILL&per_page=1", None, None).await;
    assert_eq!(page["meta"]["total"], 1);
    assert_eq!(page["data"][0]["id"], drill.as_str());

    let (status, page) = send(&app, Method::GET, "/products?sort=price_desc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"][0]["name"], "Party tent");
    let (_, page) = send(&app, Method::GET, "/products?sort=price_asc", None, None).await;
    assert_eq!(page["data"][0]["id"], drill.as_str());

    // An open request blocks deletion
    request_rental(&app, &renter, &drill).await;
    let delete_uri = format!("/listings/{}", drill);
    let (status, _) = send(&app, Method::DELETE, &delete_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, &delete_uri, Some(&renter), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = app();
    let (_, user) = sign_up(&app, "plain@example.com").await;
    let (_, admin) = sign_up(&app, ADMIN_EMAIL).await;

    let (status, _) = send(&app, Method::GET, "/admin/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send(&app, Method::GET, "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_grant_admin_needs_password_and_code() {
    let app = app();
    let (target_id, target) = sign_up(&app, "target@example.com").await;
    let (_, admin) = sign_up(&app, ADMIN_EMAIL).await;

    let (status, challenge) = send(
        &app,
        Method::POST,
        "/admin/confirmations",
        Some(&admin),
        Some(json!({ "action": "grant_admin", "target_user_id": target_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", challenge);
    let code = challenge["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    // Right code, wrong password
    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/confirmations/complete",
        Some(&admin),
        Some(json!({ "password": "not-the-password", "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::GET, "/admin/users", Some(&target), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A different login session of the same admin sees nothing pending
    let other_session = log_in(&app, ADMIN_EMAIL).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/admin/confirmations/complete",
        Some(&other_session),
        Some(json!({ "password": PASSWORD, "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No pending action");

    let (status, outcome) = send(
        &app,
        Method::POST,
        "/admin/confirmations/complete",
        Some(&admin),
        Some(json!({ "password": PASSWORD, "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", outcome);
    assert_eq!(outcome["action"], "grant_admin");
    assert_eq!(outcome["user"]["is_admin"], true);

    // Roles are read from storage, so the existing token now passes the guard
    let (status, _) = send(&app, Method::GET, "/admin/users", Some(&target), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deleted_user_token_is_rejected() {
    let app = app();
    let (target_id, target) = sign_up(&app, "leaving@example.com").await;
    let (_, admin) = sign_up(&app, ADMIN_EMAIL).await;

    let (_, challenge) = send(
        &app,
        Method::POST,
        "/admin/confirmations",
        Some(&admin),
        Some(json!({ "action": "delete_user", "target_user_id": target_id })),
    )
    .await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/confirmations/complete",
        Some(&admin),
        Some(json!({ "password": PASSWORD, "code": challenge["code"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/users/me", Some(&target), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, users) = send(&app, Method::GET, "/admin/users", Some(&admin), None).await;
    let deleted = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["id"] == target_id.as_str())
        .unwrap();
    assert!(deleted["deleted_at"].is_string());
}

#[tokio::test]
async fn test_cancelled_confirmation_cannot_complete() {
    let app = app();
    let (target_id, _) = sign_up(&app, "target@example.com").await;
    let (_, admin) = sign_up(&app, ADMIN_EMAIL).await;

    let (_, challenge) = send(
        &app,
        Method::POST,
        "/admin/confirmations",
        Some(&admin),
        Some(json!({ "action": "grant_admin", "target_user_id": target_id })),
    )
    .await;
    let (status, _) = send(&app, Method::DELETE, "/admin/confirmations", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/confirmations/complete",
        Some(&admin),
        Some(json!({ "password": PASSWORD, "code": challenge["code"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
