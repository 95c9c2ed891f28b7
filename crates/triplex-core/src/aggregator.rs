//! Metrics aggregation
//!
//! Single source of truth for the current [`Snapshot`]. Adapters and the sync
//! controller never hold metrics themselves; they send partial updates and
//! event lines here, and every mutation republishes one consistent cross-slot
//! view. Consumers treat a received snapshot as immutable.
//!
//! An aggregator belongs to exactly one session. Teardown closes it, after
//! which all writes are dropped, so a disposed session's stragglers can never
//! leak into a successor's metrics.

use crate::types::{MetricsUpdate, PlayerMetrics, SessionId, SlotKind, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

/// Maximum retained host-level error lines
pub const HOST_ERROR_CAPACITY: usize = 5;

/// Derived per-slot status lamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Error,
    Loading,
    Playing,
    Ready,
    Idle,
}

impl SlotStatus {
    /// Lamp color used by host views
    pub fn color(&self) -> &'static str {
        match self {
            SlotStatus::Error => "red",
            SlotStatus::Loading => "yellow",
            SlotStatus::Playing => "green",
            SlotStatus::Ready => "blue",
            SlotStatus::Idle => "gray",
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotStatus::Error => write!(f, "error"),
            SlotStatus::Loading => write!(f, "loading"),
            SlotStatus::Playing => write!(f, "playing"),
            SlotStatus::Ready => write!(f, "ready"),
            SlotStatus::Idle => write!(f, "idle"),
        }
    }
}

struct AggregatorState {
    slots: BTreeMap<SlotKind, PlayerMetrics>,
    slot_errors: BTreeMap<SlotKind, String>,
    loading: BTreeMap<SlotKind, bool>,
    host_errors: Vec<String>,
    closed: bool,
}

/// Owner of all per-slot metrics for one session
pub struct MetricsAggregator {
    session: SessionId,
    state: RwLock<AggregatorState>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl MetricsAggregator {
    /// Create an aggregator seeded with fresh metrics for each slot
    pub fn new(session: SessionId, slots: &[SlotKind]) -> Self {
        let mut seeded = BTreeMap::new();
        for slot in slots {
            seeded.insert(*slot, PlayerMetrics::default());
        }
        let initial = Snapshot {
            slots: seeded.clone(),
        };
        let (snapshot_tx, _) = watch::channel(initial);
        Self {
            session,
            state: RwLock::new(AggregatorState {
                slots: seeded,
                slot_errors: BTreeMap::new(),
                loading: BTreeMap::new(),
                host_errors: Vec::new(),
                closed: false,
            }),
            snapshot_tx,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Append a timestamped line to a slot's event log
    pub async fn record_event(&self, slot: SlotKind, text: impl Into<String>) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        let line = format!("{}: {}", chrono::Local::now().format("%H:%M:%S"), text.into());
        match state.slots.get_mut(&slot) {
            Some(metrics) => {
                metrics.push_event(line);
                self.publish(&state);
            }
            None => warn!(slot = %slot, "event for unconfigured slot dropped"),
        }
    }

    /// Shallow-merge a partial update into a slot's metrics
    pub async fn update(&self, slot: SlotKind, update: MetricsUpdate) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        match state.slots.get_mut(&slot) {
            Some(metrics) => {
                update.apply(metrics);
                self.publish(&state);
            }
            None => warn!(slot = %slot, "update for unconfigured slot dropped"),
        }
    }

    /// Mark a slot as loading or settled
    pub async fn set_loading(&self, slot: SlotKind, loading: bool) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        state.loading.insert(slot, loading);
    }

    /// Record the blocking error for a slot's panel
    pub async fn set_slot_error(&self, slot: SlotKind, message: impl Into<String>) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        state.slot_errors.insert(slot, message.into());
    }

    pub async fn clear_slot_error(&self, slot: SlotKind) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        state.slot_errors.remove(&slot);
    }

    pub async fn slot_error(&self, slot: SlotKind) -> Option<String> {
        self.state.read().await.slot_errors.get(&slot).cloned()
    }

    /// Append to the bounded host-level error feed
    pub async fn push_host_error(&self, message: impl Into<String>) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        while state.host_errors.len() >= HOST_ERROR_CAPACITY {
            state.host_errors.remove(0);
        }
        state.host_errors.push(message.into());
    }

    pub async fn host_errors(&self) -> Vec<String> {
        self.state.read().await.host_errors.clone()
    }

    /// Derive the status lamp for a slot
    ///
    /// Precedence: error, then loading, then playing, then ready, then idle.
    pub async fn slot_status(&self, slot: SlotKind) -> SlotStatus {
        let state = self.state.read().await;
        if state.slot_errors.contains_key(&slot) {
            return SlotStatus::Error;
        }
        if state.loading.get(&slot).copied().unwrap_or(false) {
            return SlotStatus::Loading;
        }
        match state.slots.get(&slot) {
            Some(metrics) if metrics.is_playing => SlotStatus::Playing,
            Some(metrics) if metrics.ready_state >= 3 => SlotStatus::Ready,
            _ => SlotStatus::Idle,
        }
    }

    /// Current consistent view of every slot
    pub async fn snapshot(&self) -> Snapshot {
        Snapshot {
            slots: self.state.read().await.slots.clone(),
        }
    }

    /// Subscribe to snapshot publications
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Stop accepting writes; the final snapshot stays readable
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        if !state.closed {
            state.closed = true;
            debug!(session = %self.session, "aggregator closed");
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }

    fn publish(&self, state: &AggregatorState) {
        let _ = self.snapshot_tx.send(Snapshot {
            slots: state.slots.clone(),
        });
    }
}
