//! Background reclamation of expired cache keys.

use conductor_application::ports::cache_store::CacheStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Periodically calls [`CacheStore::sweep_expired`] until cancelled
pub struct CacheSweeper {
    store: Arc<dyn CacheStore>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(store: Arc<dyn CacheStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Spawn the sweep loop; it stops when `token` is cancelled
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Cache sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.store.sweep_expired().await {
                            warn!(error = %e, "Cache sweep failed");
                        }
                    }
                }
            }
        })
    }
}
