//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and the
//! dependencies reported by the health endpoint.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{DocumentStore, HealthCheck, MemoryConfirmationStore};
use crate::services::{
    AdminService, AuthService, ProductService, RentalService, ReviewService, ServiceContainer,
    Services, UserService,
};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub product_service: Arc<dyn ProductService>,
    pub rental_service: Arc<dyn RentalService>,
    pub review_service: Arc<dyn ReviewService>,
    pub admin_service: Arc<dyn AdminService>,
    /// Backing stores checked by `/health`
    pub probes: Arc<Vec<Arc<dyn HealthCheck>>>,
}

impl AppState {
    /// Take every service out of a container.
    pub fn from_container(
        container: &dyn ServiceContainer,
        probes: Vec<Arc<dyn HealthCheck>>,
    ) -> Self {
        Self {
            auth_service: container.auth(),
            user_service: container.users(),
            product_service: container.products(),
            rental_service: container.rentals(),
            review_service: container.reviews(),
            admin_service: container.admin(),
            probes: Arc::new(probes),
        }
    }

    /// Self-contained state over a fresh in-process document store.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(DocumentStore::new());
        let probe: Arc<dyn HealthCheck> = store.clone();
        let services = Services::from_uow(
            store,
            Arc::new(MemoryConfirmationStore::new()),
            config,
        );
        Self::from_container(&services, vec![probe])
    }
}
