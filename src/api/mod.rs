//! # API Module
//!
//! REST surface of the ledger backend.
//!
//! - `routes.rs` - Route configuration
//! - `handlers.rs` - Request handlers
//!
//! All endpoints return the standard [`crate::models::ApiResponse`]
//! envelope; ledger errors map to stable error codes and HTTP statuses.

pub mod handlers;
pub mod routes;

pub use routes::configure_routes;
