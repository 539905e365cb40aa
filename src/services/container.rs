//! Service Container - Centralized service access.
//!
//! Every service is built over the same Unit of Work, so a container is
//! either fully relational or fully document-backed.

use std::sync::Arc;

use super::{
    AdminManager, AdminService, AuthService, Authenticator, ProductManager, ProductService,
    RentalManager, RentalService, ReviewManager, ReviewService, UserManager, UserService,
};
use crate::config::Config;
use crate::infra::{ConfirmationStore, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn products(&self) -> Arc<dyn ProductService>;

    fn rentals(&self) -> Arc<dyn RentalService>;

    fn reviews(&self) -> Arc<dyn ReviewService>;

    fn admin(&self) -> Arc<dyn AdminService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    user_service: Arc<dyn UserService>,
    product_service: Arc<dyn ProductService>,
    rental_service: Arc<dyn RentalService>,
    review_service: Arc<dyn ReviewService>,
    admin_service: Arc<dyn AdminService>,
}

impl Services {
    /// Wire every service over one Unit of Work.
    pub fn from_uow<U: UnitOfWork>(
        uow: Arc<U>,
        confirmations: Arc<dyn ConfirmationStore>,
        config: Config,
    ) -> Self {
        let ttl = config.confirmation_ttl_seconds;
        let auth_service: Arc<dyn AuthService> = Arc::new(Authenticator::new(uow.clone(), config));
        let product_service: Arc<dyn ProductService> = Arc::new(ProductManager::new(uow.clone()));
        let admin_service = Arc::new(AdminManager::new(
            uow.clone(),
            auth_service.clone(),
            product_service.clone(),
            confirmations,
            ttl,
        ));

        Self {
            user_service: Arc::new(UserManager::new(uow.clone())),
            rental_service: Arc::new(RentalManager::new(uow.clone())),
            review_service: Arc::new(ReviewManager::new(uow)),
            auth_service,
            product_service,
            admin_service,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn products(&self) -> Arc<dyn ProductService> {
        self.product_service.clone()
    }

    fn rentals(&self) -> Arc<dyn RentalService> {
        self.rental_service.clone()
    }

    fn reviews(&self) -> Arc<dyn ReviewService> {
        self.review_service.clone()
    }

    fn admin(&self) -> Arc<dyn AdminService> {
        self.admin_service.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::infra::{DocumentStore, MemoryConfirmationStore};
    use crate::services::fixtures;

    #[tokio::test]
    async fn test_services_share_one_store() {
        let store = Arc::new(DocumentStore::new());
        let services = Services::from_uow(
            store.clone(),
            Arc::new(MemoryConfirmationStore::new()),
            fixtures::config(),
        );

        let user = fixtures::user(&store, UserRole::User).await;
        let product = services
            .products()
            .create(user.actor(), fixtures::new_product(12))
            .await
            .unwrap();

        let listed = services.products().list_by_owner(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, product.id);
        assert_eq!(
            services.users().get_user(user.id).await.unwrap().role,
            UserRole::Owner
        );
    }
}
