//! Admin service - Moderation and confirmation-gated account actions.
//!
//! Granting or revoking admin rights and deleting users go through two
//! steps. `begin_confirmation` parks the action under the admin's login
//! session together with a one-time code. `complete_confirmation` needs the
//! admin's password and that code; only when both match is the action taken
//! out of the store and executed, exactly once.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{AuthService, ProductService};
use crate::config::MAX_CONFIRMATION_ATTEMPTS;
use crate::domain::{
    Actor, AdminAction, PendingConfirmation, Product, SessionKey, User, UserResponse, UserRole,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{ConfirmationStore, UnitOfWork};
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Returned when a sensitive action is parked for confirmation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfirmationChallenge {
    pub action: AdminAction,
    pub target_user_id: Uuid,
    /// One-time code the admin must enter to confirm
    #[schema(example = "aB3xY9")]
    pub code: String,
    pub expires_in: u64,
}

/// Result of a confirmed action
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfirmationOutcome {
    pub action: AdminAction,
    pub user: UserResponse,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AdminService: Send + Sync {
    /// All users including soft-deleted ones
    async fn list_users(&self, actor: Actor) -> AppResult<Vec<User>>;

    /// All products including soft-deleted ones
    async fn list_products(&self, actor: Actor) -> AppResult<Vec<Product>>;

    async fn delete_product(&self, actor: Actor, product_id: Uuid) -> AppResult<()>;

    /// Park `action` for this session, replacing any earlier one
    async fn begin_confirmation(
        &self,
        actor: Actor,
        session_id: Uuid,
        action: AdminAction,
        target_user_id: Uuid,
    ) -> AppResult<ConfirmationChallenge>;

    /// Re-authenticate, check the code and run the parked action
    async fn complete_confirmation(
        &self,
        actor: Actor,
        session_id: Uuid,
        password: String,
        code: String,
    ) -> AppResult<ConfirmationOutcome>;

    /// Drop the parked action, if any
    async fn cancel_confirmation(&self, actor: Actor, session_id: Uuid) -> AppResult<()>;
}

pub struct AdminManager<U: UnitOfWork> {
    uow: Arc<U>,
    auth: Arc<dyn AuthService>,
    products: Arc<dyn ProductService>,
    confirmations: Arc<dyn ConfirmationStore>,
    ttl_seconds: u64,
}

impl<U: UnitOfWork> AdminManager<U> {
    pub fn new(
        uow: Arc<U>,
        auth: Arc<dyn AuthService>,
        products: Arc<dyn ProductService>,
        confirmations: Arc<dyn ConfirmationStore>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            uow,
            auth,
            products,
            confirmations,
            ttl_seconds,
        }
    }

    fn no_pending() -> AppError {
        AppError::validation("No pending action")
    }

    /// Count a failed completion; the third one drops the pending action.
    async fn reject(&self, key: SessionKey, mut pending: PendingConfirmation) -> AppError {
        pending.failed_attempts += 1;
        let remaining = MAX_CONFIRMATION_ATTEMPTS.saturating_sub(pending.failed_attempts);

        tracing::warn!(
            admin_id = %key.admin_id,
            action = %pending.action,
            attempts = pending.failed_attempts,
            "Admin confirmation failed"
        );

        let stored = if remaining == 0 {
            self.confirmations.discard(key).await
        } else {
            self.confirmations.record_failure(key, pending).await
        };
        if let Err(e) = stored {
            return e;
        }

        if remaining == 0 {
            AppError::validation("Too many failed attempts, start again")
        } else {
            AppError::validation(format!(
                "Password or confirmation code is incorrect ({} attempts left)",
                remaining
            ))
        }
    }

    /// Role a revoked admin falls back to
    async fn demoted_role(&self, user_id: Uuid) -> AppResult<UserRole> {
        let owned = self.uow.products().list_by_owner(user_id).await?;
        Ok(if owned.is_empty() {
            UserRole::User
        } else {
            UserRole::Owner
        })
    }

    async fn execute(&self, pending: &PendingConfirmation) -> AppResult<User> {
        let fallback = match pending.action {
            AdminAction::RevokeAdmin => Some(self.demoted_role(pending.target_user_id).await?),
            _ => None,
        };
        let action = pending.action;
        let target_id = pending.target_user_id;

        with_transaction!(self.uow, |tx| {
            let mut target = tx.find_user(target_id).await?.ok_or(AppError::NotFound)?;
            match (action, fallback) {
                (AdminAction::GrantAdmin, _) => target.update_role(UserRole::Admin),
                (AdminAction::RevokeAdmin, Some(role)) => target.update_role(role),
                (AdminAction::RevokeAdmin, None) => {
                    return Err(AppError::internal("Missing fallback role"))
                }
                (AdminAction::DeleteUser, _) => target.soft_delete(),
            }
            tx.update_user(&target).await?;
            Ok(target)
        })
    }
}

#[async_trait]
impl<U: UnitOfWork> AdminService for AdminManager<U> {
    async fn list_users(&self, actor: Actor) -> AppResult<Vec<User>> {
        actor.require_admin()?;
        self.uow.users().list(true).await
    }

    async fn list_products(&self, actor: Actor) -> AppResult<Vec<Product>> {
        actor.require_admin()?;
        self.uow.products().list_all(true).await
    }

    async fn delete_product(&self, actor: Actor, product_id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        self.products.delete(actor, product_id).await
    }

    async fn begin_confirmation(
        &self,
        actor: Actor,
        session_id: Uuid,
        action: AdminAction,
        target_user_id: Uuid,
    ) -> AppResult<ConfirmationChallenge> {
        actor.require_admin()?;

        let target = self
            .uow
            .users()
            .find_by_id(target_user_id)
            .await?
            .ok_or_not_found()?;

        match action {
            AdminAction::RevokeAdmin | AdminAction::DeleteUser if target.id == actor.id => {
                return Err(AppError::validation("You cannot do this to your own account"));
            }
            AdminAction::GrantAdmin if target.is_admin() => {
                return Err(AppError::validation("User is already an admin"));
            }
            AdminAction::RevokeAdmin if !target.is_admin() => {
                return Err(AppError::validation("User is not an admin"));
            }
            _ => {}
        }

        let pending = PendingConfirmation::new(action, target.id, self.ttl_seconds);
        let challenge = ConfirmationChallenge {
            action,
            target_user_id: target.id,
            code: pending.code.clone(),
            expires_in: self.ttl_seconds,
        };
        self.confirmations
            .save(SessionKey::new(actor.id, session_id), pending)
            .await?;

        tracing::info!(admin_id = %actor.id, %action, target_id = %target.id, "Admin confirmation started");
        Ok(challenge)
    }

    async fn complete_confirmation(
        &self,
        actor: Actor,
        session_id: Uuid,
        password: String,
        code: String,
    ) -> AppResult<ConfirmationOutcome> {
        actor.require_admin()?;
        let key = SessionKey::new(actor.id, session_id);

        let pending = self
            .confirmations
            .load(key)
            .await?
            .ok_or_else(Self::no_pending)?;
        if pending.is_expired() {
            self.confirmations.discard(key).await?;
            return Err(Self::no_pending());
        }

        let password_ok = match self.auth.reauthenticate(actor.id, password).await {
            Ok(()) => true,
            Err(AppError::InvalidCredentials) => false,
            Err(e) => return Err(e),
        };
        if !(password_ok && pending.code_matches(&code)) {
            return Err(self.reject(key, pending).await);
        }

        // Only the caller that removes the entry gets to run the action
        let taken = self
            .confirmations
            .take(key)
            .await?
            .filter(|taken| !taken.is_expired())
            .ok_or_else(Self::no_pending)?;

        // A begin in between may have replaced the checked entry
        if !(taken.code_matches(&code) && taken.is_same_request(&pending)) {
            self.confirmations.save(key, taken).await?;
            return Err(Self::no_pending());
        }

        let user = self.execute(&taken).await?;
        tracing::info!(
            admin_id = %actor.id,
            action = %taken.action,
            target_id = %user.id,
            "Admin action confirmed"
        );

        Ok(ConfirmationOutcome {
            action: taken.action,
            user: user.into(),
        })
    }

    async fn cancel_confirmation(&self, actor: Actor, session_id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        self.confirmations
            .discard(SessionKey::new(actor.id, session_id))
            .await
    }
}
