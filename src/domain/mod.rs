//! Domain layer - Core business entities and logic
//!
//! Entities and value objects for the rental marketplace. Nothing in here
//! talks to a database; the lifecycle rules live on the entities.

pub mod confirmation;
pub mod password;
pub mod product;
pub mod rental;
pub mod review;
pub mod user;

pub use confirmation::{AdminAction, PendingConfirmation, SessionKey};
pub use password::Password;
pub use product::{Category, NewProduct, Product, ProductPatch};
pub use rental::{Rental, RentalStatus, Transition};
pub use review::{RatingSummary, Review};
pub use user::{Actor, User, UserResponse, UserRole};
