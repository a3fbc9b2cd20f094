//! Doorstep Services Library
//!
//! Business services composed over the database and storage layers: the
//! matching engine (create / nearby / claim), the lifecycle controller
//! (role-scoped transitions and payment signals), the document lifecycle
//! manager (grants and the TTL sweep), the request expiry sweeper, and the
//! best-effort geocoder.

pub mod documents;
pub mod geocode;
pub mod lifecycle;
pub mod matching;
pub mod sweeper;

pub use documents::DocumentLifecycleManager;
pub use geocode::Geocoder;
pub use lifecycle::{compute_split, LifecycleController};
pub use matching::MatchingEngine;
pub use sweeper::ExpirySweeper;
