//! HTTP request handlers.

pub mod admin_handler;
pub mod auth_handler;
pub mod product_handler;
pub mod rental_handler;
pub mod user_handler;

pub use admin_handler::admin_routes;
pub use auth_handler::auth_routes;
pub use product_handler::{listing_routes, product_routes};
pub use rental_handler::{dashboard_routes, rental_routes};
pub use user_handler::user_routes;
