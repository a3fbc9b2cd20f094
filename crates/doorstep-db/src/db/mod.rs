//! Database repositories for data access layer
//!
//! Each repository is responsible for one domain entity and provides CRUD
//! plus the specialized conditional queries its entity needs. The geography
//! reads live in `geo` (the GeoIndex), kept apart from the row-mutating
//! repositories.

pub mod agent_location;
pub mod document;
pub mod geo;
pub mod request;

pub use agent_location::AgentLocationRepository;
pub use document::DocumentRepository;
pub use geo::{GeoIndex, NearbyAgent};
pub use request::RequestRepository;
