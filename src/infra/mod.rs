//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections, migrations and repositories
//! - The in-process document store
//! - Caching (Redis) for confirmation state
//! - Unit of Work for transaction management

use async_trait::async_trait;

use crate::errors::AppResult;

pub mod cache;
pub mod confirmation_store;
pub mod db;
pub mod document_store;
pub mod repositories;
pub mod unit_of_work;

pub use cache::Cache;
pub use confirmation_store::{ConfirmationStore, MemoryConfirmationStore};
pub use db::{Database, Migrator};
pub use document_store::DocumentStore;
pub use repositories::{
    ProductFilter, ProductRepository, ProductSort, RentalRepository, ReviewRepository,
    UserRepository,
};
pub use unit_of_work::{Persistence, TransactionContext, TxFuture, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use confirmation_store::MockConfirmationStore;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{
    MockProductRepository, MockRentalRepository, MockReviewRepository, MockUserRepository,
};

/// A dependency reported by the health endpoint.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn ping(&self) -> AppResult<()>;
}
