//! Data models for the application
//!
//! Organized by domain: check-in requests (the marketplace entity), evidence
//! documents, actor identity, and geodetic points.

mod actor;
mod document;
mod geo;
mod request;

pub use actor::*;
pub use document::*;
pub use geo::*;
pub use request::*;
