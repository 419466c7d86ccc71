//! PeriodicSync - background reconciliation of broker catalogs.
//!
//! Runs a full sync on a fixed interval so broker-side state converges even
//! when a push was missed. Failures are logged and the loop carries on.
//!
//! ## Graceful Shutdown
//!
//! The loop listens on a `watch` channel and stops as soon as `true` is
//! sent or the sender is dropped. A sync in progress is finished first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::sync_engine::OfferSyncEngine;

pub struct PeriodicSync {
    sync: Arc<OfferSyncEngine>,
    interval: Duration,
}

impl PeriodicSync {
    pub fn new(sync: Arc<OfferSyncEngine>, interval: Duration) -> Self {
        Self { sync, interval }
    }

    /// Runs until shutdown. Returns the number of syncs performed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut interval = time::interval_at(time::Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rounds = 0;

        tracing::info!(interval_secs = self.interval.as_secs(), "Periodic sync started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(rounds, "Periodic sync stopped");
                        return rounds;
                    }
                }
                _ = interval.tick() => {
                    rounds += 1;
                    match self.sync.full_sync().await {
                        Ok(report) => {
                            tracing::debug!(brokers = report.synced.len(), "Periodic sync complete");
                        }
                        Err(err) => {
                            tracing::warn!(code = %err.code(), error = %err, "Periodic sync failed");
                        }
                    }
                }
            }
        }
    }
}
