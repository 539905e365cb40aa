//! Authentication service - Handles user authentication and authorization.
//!
//! Issues session-scoped JWTs, resolves bearer tokens to the current user
//! and re-authenticates admins before sensitive actions. Password hashing
//! lives in the domain `Password` value object.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{Actor, Password, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    /// Login session, fresh for every login
    pub sid: Uuid,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token expiration time in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

/// The authenticated caller behind a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    /// Current role from storage, not the one baked into the token
    pub role: UserRole,
    pub session_id: Uuid,
}

impl Identity {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// Authentication service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user
    async fn register(&self, email: String, password: String, name: String) -> AppResult<User>;

    /// Login and return JWT token
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT signature and expiry and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Resolve a token to an active user. Deleted accounts are rejected.
    async fn authenticate(&self, token: &str) -> AppResult<Identity>;

    /// Check `password` against the stored hash of `user_id`.
    async fn reauthenticate(&self, user_id: Uuid, password: String) -> AppResult<()>;
}

/// Normalized form used for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_token(user: &User, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role.to_string(),
        sid: Uuid::new_v4(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
    })
}

fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self { uow, config }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn register(&self, email: String, password: String, name: String) -> AppResult<User> {
        let email = normalize_email(&email);
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Name is required"));
        }

        // Soft-deleted accounts keep their email reserved
        if self.uow.users().find_by_email_with_deleted(&email).await?.is_some() {
            return Err(AppError::conflict("Email is already registered"));
        }

        let role = if self.config.is_bootstrap_admin(&email) {
            UserRole::Admin
        } else {
            UserRole::User
        };
        let password_hash = Password::new(&password)?.into_string();

        let user = self
            .uow
            .users()
            .create(User::new(email, password_hash, name, role))
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let user = self.uow.users().find_by_email(&normalize_email(&email)).await?;

        // Unknown emails still pay for a hash verification
        Password::check(user.as_ref().map(|u| u.password_hash.as_str()), &password)?;

        let user = user.ok_or(AppError::InvalidCredentials)?;
        generate_token(&user, &self.config)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }

    async fn authenticate(&self, token: &str) -> AppResult<Identity> {
        let claims = self.verify_token(token)?;
        let user = self
            .uow
            .users()
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(Identity {
            id: user.id,
            email: user.email,
            role: user.role,
            session_id: claims.sid,
        })
    }

    async fn reauthenticate(&self, user_id: Uuid, password: String) -> AppResult<()> {
        let user = self.uow.users().find_by_id(user_id).await?;
        Password::check(user.as_ref().map(|u| u.password_hash.as_str()), &password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::DocumentStore;
    use crate::services::fixtures;

    fn service(config: Config) -> (Arc<DocumentStore>, Authenticator<DocumentStore>) {
        let store = Arc::new(DocumentStore::new());
        (store.clone(), Authenticator::new(store, config))
    }

    #[tokio::test]
    async fn test_register_normalizes_email_and_rejects_duplicates() {
        let (_, auth) = service(fixtures::config());

        let user = auth
            .register(" Ann@Example.com ".into(), "password123".into(), "Ann".into())
            .await
            .unwrap();
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.role, UserRole::User);

        let again = auth
            .register("ann@example.com".into(), "password123".into(), "Ann".into())
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_email() {
        let mut config = fixtures::config();
        config.admin_emails = vec!["root@example.com".into()];
        let (_, auth) = service(config);

        let admin = auth
            .register("ROOT@example.com".into(), "password123".into(), "Root".into())
            .await
            .unwrap();
        assert!(admin.is_admin());
    }

    #[tokio::test]
    async fn test_each_login_gets_a_new_session() {
        let (_, auth) = service(fixtures::config());
        auth.register("bob@example.com".into(), "password123".into(), "Bob".into())
            .await
            .unwrap();

        let first = auth
            .login("bob@example.com".into(), "password123".into())
            .await
            .unwrap();
        let second = auth
            .login("bob@example.com".into(), "password123".into())
            .await
            .unwrap();

        let a = auth.authenticate(&first.access_token).await.unwrap();
        let b = auth.authenticate(&second.access_token).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.session_id, b.session_id);
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let (_, auth) = service(fixtures::config());
        auth.register("eve@example.com".into(), "password123".into(), "Eve".into())
            .await
            .unwrap();

        let wrong_password = auth
            .login("eve@example.com".into(), "password124".into())
            .await;
        let unknown = auth
            .login("nobody@example.com".into(), "password123".into())
            .await;

        assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_deleted_user_token_is_rejected() {
        let (store, auth) = service(fixtures::config());
        let mut user = auth
            .register("gone@example.com".into(), "password123".into(), "Gone".into())
            .await
            .unwrap();
        let token = auth
            .login("gone@example.com".into(), "password123".into())
            .await
            .unwrap();

        user.soft_delete();
        store.users().update(user).await.unwrap();

        let result = auth.authenticate(&token.access_token).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_reauthenticate() {
        let (_, auth) = service(fixtures::config());
        let user = auth
            .register("amy@example.com".into(), "password123".into(), "Amy".into())
            .await
            .unwrap();

        assert!(auth.reauthenticate(user.id, "password123".into()).await.is_ok());
        assert!(matches!(
            auth.reauthenticate(user.id, "nope-nope".into()).await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let (_, auth) = service(fixtures::config());
        assert!(auth.verify_token("not.a.jwt").is_err());
    }
}
