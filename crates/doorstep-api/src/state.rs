//! Application state shared across handlers.

use std::sync::Arc;

use doorstep_core::Config;
use doorstep_services::{DocumentLifecycleManager, LifecycleController, MatchingEngine};
use sqlx::PgPool;

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub matching: MatchingEngine,
    pub lifecycle: Arc<LifecycleController>,
    pub documents: Arc<DocumentLifecycleManager>,
}
