//! Shared types for list and write endpoints.

mod pagination;
mod response;

pub use pagination::{Paginated, PaginationMeta, PaginationParams, ProductPage};
pub use response::{Created, NoContent};
