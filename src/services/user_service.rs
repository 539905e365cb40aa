//! User service - Profile reads and updates.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::User;
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User service trait for dependency injection.
///
/// Operations exclude soft-deleted users unless stated otherwise.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get active user by ID
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// Change the display name of an active user
    async fn update_profile(&self, id: Uuid, name: String) -> AppResult<User>;

    /// List users, optionally including soft-deleted ones
    async fn list_users(&self, include_deleted: bool) -> AppResult<Vec<User>>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.uow.users().find_by_id(id).await?.ok_or_not_found()
    }

    async fn update_profile(&self, id: Uuid, name: String) -> AppResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Name is required"));
        }

        let mut user = self.get_user(id).await?;
        user.update_name(name.to_string());
        self.uow.users().update(user).await
    }

    async fn list_users(&self, include_deleted: bool) -> AppResult<Vec<User>> {
        self.uow.users().list(include_deleted).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::infra::DocumentStore;
    use crate::services::fixtures;

    #[tokio::test]
    async fn test_update_profile_trims_name() {
        let store = Arc::new(DocumentStore::new());
        let user = fixtures::user(&store, UserRole::User).await;
        let service = UserManager::new(store);

        let updated = service.update_profile(user.id, "  Jo  ".into()).await.unwrap();
        assert_eq!(updated.name, "Jo");
        assert_eq!(service.get_user(user.id).await.unwrap().name, "Jo");
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let store = Arc::new(DocumentStore::new());
        let user = fixtures::user(&store, UserRole::User).await;
        let service = UserManager::new(store);

        let result = service.update_profile(user.id, "   ".into()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_hides_deleted_users_by_default() {
        let store = Arc::new(DocumentStore::new());
        let mut gone = fixtures::user(&store, UserRole::User).await;
        fixtures::user(&store, UserRole::Owner).await;
        gone.soft_delete();
        store.users().update(gone).await.unwrap();

        let service = UserManager::new(store);
        assert_eq!(service.list_users(false).await.unwrap().len(), 1);
        assert_eq!(service.list_users(true).await.unwrap().len(), 2);
        assert!(matches!(
            service.get_user(Uuid::new_v4()).await,
            Err(AppError::NotFound)
        ));
    }
}
