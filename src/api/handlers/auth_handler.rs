//! Sign-up and sign-in.
//!
//! Both routes are public. Each successful login opens a new session whose
//! id travels in the token and scopes pending admin confirmations.

use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::domain::UserResponse;
use crate::errors::AppResult;
use crate::services::TokenResponse;
use crate::types::Created;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Normalised to lower case before it is stored
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "renter@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "correct-horse-battery", min_length = 8)]
    pub password: String,
    /// Shown on listings and reviews
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    #[schema(example = "Sam Rivera")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "renter@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "correct-horse-battery")]
    pub password: String,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Create an account. Emails listed in `ADMIN_EMAILS` start out as admins.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Malformed email, short password or blank name"),
        (status = 409, description = "Email is already registered, deleted accounts included")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Created<UserResponse>> {
    let RegisterRequest {
        email,
        password,
        name,
    } = payload;
    let user = state.auth_service.register(email, password, name).await?;
    Ok(Created(user.into()))
}

/// Exchange credentials for a bearer token bound to a new session.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token for a new session", body = TokenResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Unknown email or wrong password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    state
        .auth_service
        .login(payload.email, payload.password)
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }

    #[test]
    fn test_register_rules() {
        assert!(register("sam@example.com", "long-enough", "Sam").validate().is_ok());

        let errors = register("not-an-email", "short", "").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("name"));
    }

    #[test]
    fn test_login_needs_a_password() {
        let login = LoginRequest {
            email: "sam@example.com".into(),
            password: String::new(),
        };
        assert!(login.validate().is_err());
    }
}
