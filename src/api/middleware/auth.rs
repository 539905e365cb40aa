//! JWT authentication middleware.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::domain::{Actor, UserRole};
use crate::errors::AppError;
use crate::services::Identity;

/// Authenticated user resolved from the bearer token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: UserRole,
    /// Login session the token was issued for
    pub session_id: Uuid,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

impl From<Identity> for CurrentUser {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            role: identity.role,
            session_id: identity.session_id,
        }
    }
}

/// JWT authentication middleware.
///
/// Resolves the bearer token to an active user and injects the
/// `CurrentUser` into the request extensions. Tokens of deleted users are
/// rejected.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
        .ok_or(AppError::Unauthorized)?;

    let identity = state.auth_service.authenticate(token).await?;
    request.extensions_mut().insert(CurrentUser::from(identity));

    Ok(next.run(request).await)
}

/// Admin guard. Must run after `auth_middleware`.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::Unauthorized)?;

    if !user.is_admin() {
        tracing::warn!(user_id = %user.id, path = %request.uri().path(), "Admin route refused");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}
