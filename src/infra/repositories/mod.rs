//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.
//! They serve reads; multi-record writes go through a `TransactionContext`.

pub(crate) mod entities;
mod product_repository;
mod rental_repository;
mod review_repository;
mod user_repository;

pub use product_repository::{ProductFilter, ProductRepository, ProductSort, ProductStore};
pub use rental_repository::{RentalRepository, RentalStore};
pub use review_repository::{ReviewRepository, ReviewStore};
pub use user_repository::{UserRepository, UserStore};

pub(crate) use user_repository::map_insert_err;

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use product_repository::MockProductRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use rental_repository::MockRentalRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use review_repository::MockReviewRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
