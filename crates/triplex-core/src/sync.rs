//! Synchronized transport control
//!
//! Fans one transport command out to every active slot, then stamps the
//! action into every slot's event log. Best-effort by contract: there is no
//! shared transaction, a failing sink never blocks the command from reaching
//! its siblings, and the log line is appended whether or not the underlying
//! command took effect. Confirmation comes indirectly, from each adapter's
//! own event feed and position samples.

use crate::adapter::SlotAdapter;
use crate::aggregator::MetricsAggregator;
use crate::types::SlotKind;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Transport fan-out over one session's adapters
pub struct SyncController {
    adapters: Vec<Arc<SlotAdapter>>,
    aggregator: Arc<MetricsAggregator>,
}

impl SyncController {
    pub fn new(adapters: Vec<Arc<SlotAdapter>>, aggregator: Arc<MetricsAggregator>) -> Self {
        Self {
            adapters,
            aggregator,
        }
    }

    /// Slots under this controller, in panel order
    pub fn slots(&self) -> Vec<SlotKind> {
        self.adapters.iter().map(|a| a.slot()).collect()
    }

    /// Start playback everywhere
    #[instrument(skip(self))]
    pub async fn play_all(&self) {
        for adapter in &self.adapters {
            if let Err(e) = adapter.play().await {
                warn!(slot = %adapter.slot(), error = %e, "sync play failed");
            }
        }
        for adapter in &self.adapters {
            self.aggregator
                .record_event(adapter.slot(), "Sync play triggered")
                .await;
        }
    }

    /// Pause playback everywhere
    #[instrument(skip(self))]
    pub async fn pause_all(&self) {
        for adapter in &self.adapters {
            if let Err(e) = adapter.pause().await {
                warn!(slot = %adapter.slot(), error = %e, "sync pause failed");
            }
        }
        for adapter in &self.adapters {
            self.aggregator
                .record_event(adapter.slot(), "Sync pause triggered")
                .await;
        }
    }

    /// Seek every slot to `target` seconds
    #[instrument(skip(self))]
    pub async fn seek_all(&self, target: f64) {
        for adapter in &self.adapters {
            if let Err(e) = adapter.seek(target).await {
                warn!(slot = %adapter.slot(), error = %e, "sync seek failed");
            }
        }
        for adapter in &self.adapters {
            self.aggregator
                .record_event(adapter.slot(), format!("Sync seek to {}s", target))
                .await;
        }
    }
}
