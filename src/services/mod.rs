//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.
//!
//! All services use Unit of Work pattern for centralized repository
//! access and transaction management.

mod admin_service;
mod auth_service;
pub mod container;
mod product_service;
mod rental_service;
mod review_service;
mod user_service;

#[cfg(test)]
mod fixtures;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use admin_service::{AdminManager, AdminService, ConfirmationChallenge, ConfirmationOutcome};
pub use auth_service::{
    normalize_email, AuthService, Authenticator, Claims, Identity, TokenResponse,
};
pub use product_service::{ProductManager, ProductService};
pub use rental_service::{NewRental, OwnerSummary, RentalManager, RentalService};
pub use review_service::{ReviewManager, ReviewService};
pub use user_service::{UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use admin_service::MockAdminService;
#[cfg(any(test, feature = "test-utils"))]
pub use auth_service::MockAuthService;
#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
#[cfg(any(test, feature = "test-utils"))]
pub use product_service::MockProductService;
#[cfg(any(test, feature = "test-utils"))]
pub use rental_service::MockRentalService;
#[cfg(any(test, feature = "test-utils"))]
pub use review_service::MockReviewService;
#[cfg(any(test, feature = "test-utils"))]
pub use user_service::MockUserService;
