//! Time-driven expiry of overdue pending requests.
//!
//! The sweep is a stateless conditional operation; any number of process
//! instances may run it concurrently and a racing claim resolves atomically
//! at the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::lifecycle::LifecycleController;

pub struct ExpirySweeper {
    lifecycle: Arc<LifecycleController>,
    sweep_interval: Duration,
}

impl ExpirySweeper {
    pub fn new(lifecycle: Arc<LifecycleController>, sweep_interval_secs: u64) -> Self {
        Self {
            lifecycle,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }

    /// Start the background expiry loop. Returns a JoinHandle for shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(self.sweep_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tick.tick().await;

                if let Err(e) = self.lifecycle.expire_due().await {
                    tracing::error!(error = %e, "Request expiry sweep failed");
                }
            }
        })
    }
}
