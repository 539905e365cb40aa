//! Application route configuration.

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, middleware, response::Json, routing::get, Router};
use futures::future::join_all;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    admin_routes, auth_routes, dashboard_routes, listing_routes, product_routes, rental_routes,
    user_routes,
};
use super::middleware::{admin_middleware, auth_middleware};
use super::openapi::ApiDoc;
use super::AppState;

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let authenticated = middleware::from_fn_with_state(state.clone(), auth_middleware);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        // Signed-in users
        .nest("/users", user_routes().route_layer(authenticated.clone()))
        .nest("/listings", listing_routes().route_layer(authenticated.clone()))
        .nest("/rentals", rental_routes().route_layer(authenticated.clone()))
        .nest("/dashboard", dashboard_routes().route_layer(authenticated.clone()))
        // Admins; the outer layer authenticates before the guard runs
        .nest(
            "/admin",
            admin_routes()
                .route_layer(middleware::from_fn(admin_middleware))
                .route_layer(authenticated.clone()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "RentEase API"
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    services: BTreeMap<&'static str, ServiceStatus>,
}

/// Service status
#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint pinging every backing store
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let results = join_all(state.probes.iter().map(|probe| async move {
        let status = match probe.ping().await {
            Ok(()) => ServiceStatus {
                status: "healthy",
                error: None,
            },
            Err(e) => {
                tracing::warn!(service = probe.name(), error = %e, "Health probe failed");
                ServiceStatus {
                    status: "unhealthy",
                    error: Some(e.code().to_string()),
                }
            }
        };
        (probe.name(), status)
    }))
    .await;

    let all_healthy = results.iter().all(|(_, s)| s.error.is_none());
    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" },
        services: results.into_iter().collect(),
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
