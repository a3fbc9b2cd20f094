//! Doorstep API Library
//!
//! This crate provides the HTTP API handlers, actor extraction, and
//! application setup.

mod api_doc;
mod handlers;

// Public modules
pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use error::ErrorResponse;
pub use setup::{build_router, initialize_app, start_server};
