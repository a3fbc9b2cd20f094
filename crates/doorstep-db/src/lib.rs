//! Doorstep database layer
//!
//! sqlx/PostgreSQL repositories for the data access layer. The durable store
//! is the single synchronization point of the system: every exclusive state
//! change (claim, transition, payment application, expiry) is one conditional
//! UPDATE whose affected-row count decides the outcome, so any number of
//! process instances can operate concurrently without application locks.
//!
//! Requires PostGIS for the geography columns used by proximity queries.

pub mod db;

pub use db::{
    AgentLocationRepository, DocumentRepository, GeoIndex, NearbyAgent, RequestRepository,
};

/// Embedded migrations; run at startup via `MIGRATOR.run(&pool)`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
