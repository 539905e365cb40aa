//! RentEase - Peer-to-peer rental marketplace API
//!
//! Users list products, browse listings and request rentals. Owners approve,
//! decline and mark returns; renters review completed rentals; admins
//! moderate through a confirmation-gated panel.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities and lifecycle rules
//! - **services**: Application use cases over a Unit of Work
//! - **infra**: PostgreSQL and in-process document adapters, Redis
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination, responses)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Everything in memory, no PostgreSQL or Redis needed
//! STORAGE_BACKEND=document cargo run -- serve
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Password, User, UserRole};
pub use errors::{AppError, AppResult};
