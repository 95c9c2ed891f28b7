//! Session lifecycle management
//!
//! A [`ComparisonSession`] owns everything one source-load needs: a fresh
//! aggregator, one adapter per configured slot, and a sync controller over
//! them. Construction is a single atomic transition, and so is teardown.
//! Metrics never carry over: each initialize seeds new state, each teardown
//! disposes every adapter and closes the aggregator so stragglers from the
//! old session cannot write into a successor.

use crate::adapter::SlotAdapter;
use crate::aggregator::{MetricsAggregator, SlotStatus};
use crate::capability::PlaybackEnvironment;
use crate::catalog::StreamConfig;
use crate::comparison::{compare, ComparisonReport};
use crate::error::{Error, Result};
use crate::sync::SyncController;
use crate::types::{HarnessMode, SessionId, SlotKind, Snapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{info, instrument, warn};

/// Lifecycle states for one comparison session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Initializing,
    Ready,
    Failed,
}

impl SessionState {
    /// Check if transition to new state is valid
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Idle, SessionState::Initializing)
                | (SessionState::Initializing, SessionState::Ready)
                | (SessionState::Initializing, SessionState::Failed)
                | (SessionState::Initializing, SessionState::Idle)
                | (SessionState::Ready, SessionState::Idle)
                | (SessionState::Failed, SessionState::Idle)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Default)]
struct SessionInner {
    aggregator: Option<Arc<MetricsAggregator>>,
    adapters: Vec<Arc<SlotAdapter>>,
    sync: Option<SyncController>,
    stream: Option<StreamConfig>,
}

/// One source-load comparison across the configured slots
pub struct ComparisonSession {
    id: SessionId,
    mode: HarnessMode,
    env: Arc<dyn PlaybackEnvironment>,
    state: RwLock<SessionState>,
    state_tx: watch::Sender<SessionState>,
    inner: RwLock<SessionInner>,
}

impl ComparisonSession {
    pub fn new(env: Arc<dyn PlaybackEnvironment>, mode: HarnessMode) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            id: SessionId::new(),
            mode,
            env,
            state: RwLock::new(SessionState::Idle),
            state_tx,
            inner: RwLock::new(SessionInner::default()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> HarnessMode {
        self.mode
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Subscribe to lifecycle state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    async fn set_state(&self, next: SessionState) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(Error::InvalidStateTransition {
                from: state.to_string(),
                to: next.to_string(),
            });
        }
        *state = next;
        let _ = self.state_tx.send(next);
        Ok(())
    }

    /// Bring every configured slot up against `stream`
    ///
    /// Slots are independent pipelines: initialization runs concurrently, one
    /// slot failing does not abort its siblings, and the session lands in
    /// `Ready` as long as at least one slot came up. Only a session with zero
    /// live slots is `Failed`. A previous session for this object must be
    /// torn down first.
    #[instrument(skip(self, stream), fields(session = %self.id, url = %stream.url))]
    pub async fn initialize(&self, stream: StreamConfig) -> Result<()> {
        self.set_state(SessionState::Initializing).await?;
        info!(name = %stream.name, mode = %self.mode, "initializing comparison session");

        let slots = self.mode.slots();
        let aggregator = Arc::new(MetricsAggregator::new(self.id, slots));
        let mut handles = Vec::new();
        for slot in slots {
            let slot = *slot;
            let url = stream.url.clone();
            let env = Arc::clone(&self.env);
            let aggregator = Arc::clone(&aggregator);
            handles.push(tokio::spawn(async move {
                (
                    slot,
                    SlotAdapter::initialize(slot, &url, env.as_ref(), aggregator).await,
                )
            }));
        }

        // Handles are awaited in panel order so the adapter list stays stable
        // even though the slots come up in parallel
        let mut adapters = Vec::new();
        let mut failed = 0usize;
        for handle in handles {
            match handle.await {
                Ok((_, Ok(adapter))) => adapters.push(adapter),
                Ok((slot, Err(e))) => {
                    failed += 1;
                    warn!(slot = %slot, error = %e, "slot failed to initialize");
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "slot initialization task failed");
                }
            }
        }

        let live = adapters.len();
        {
            let mut inner = self.inner.write().await;
            inner.sync = Some(SyncController::new(adapters.clone(), aggregator.clone()));
            inner.aggregator = Some(aggregator);
            inner.adapters = adapters;
            inner.stream = Some(stream);
        }

        if live == 0 {
            self.set_state(SessionState::Failed).await?;
            return Err(Error::SessionNotReady(format!(
                "all {} slots failed to initialize",
                failed
            )));
        }
        self.set_state(SessionState::Ready).await?;
        info!(live, failed, "session ready");
        Ok(())
    }

    /// Dispose every adapter and close the aggregator
    ///
    /// Safe to call in any state and more than once. Disposers run before
    /// the aggregator closes so in-flight lines still land; after this
    /// returns, nothing from this session can write metrics anywhere.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn teardown(&self) {
        let SessionInner {
            aggregator,
            adapters,
            ..
        } = {
            let mut inner = self.inner.write().await;
            std::mem::take(&mut *inner)
        };

        for adapter in adapters {
            adapter.dispose().await;
        }
        if let Some(aggregator) = aggregator {
            aggregator.close().await;
        }

        let current = self.state().await;
        if current != SessionState::Idle {
            self.set_state(SessionState::Idle).await.ok();
        }
        info!("session torn down");
    }

    /// The stream this session was initialized with
    pub async fn stream(&self) -> Option<StreamConfig> {
        self.inner.read().await.stream.clone()
    }

    /// Current consistent cross-slot view
    pub async fn snapshot(&self) -> Result<Snapshot> {
        match &self.inner.read().await.aggregator {
            Some(aggregator) => Ok(aggregator.snapshot().await),
            None => Err(Error::SessionNotReady("no active session".to_string())),
        }
    }

    /// Subscribe to snapshot publications
    pub async fn subscribe_snapshot(&self) -> Result<watch::Receiver<Snapshot>> {
        match &self.inner.read().await.aggregator {
            Some(aggregator) => Ok(aggregator.subscribe()),
            None => Err(Error::SessionNotReady("no active session".to_string())),
        }
    }

    /// Derived statistics for the current snapshot
    pub async fn comparison(&self) -> Result<ComparisonReport> {
        Ok(compare(&self.snapshot().await?))
    }

    /// Status lamp for one slot
    pub async fn slot_status(&self, slot: SlotKind) -> Result<SlotStatus> {
        match &self.inner.read().await.aggregator {
            Some(aggregator) => Ok(aggregator.slot_status(slot).await),
            None => Err(Error::SessionNotReady("no active session".to_string())),
        }
    }

    /// Blocking error for one slot's panel, if any
    pub async fn slot_error(&self, slot: SlotKind) -> Option<String> {
        match &self.inner.read().await.aggregator {
            Some(aggregator) => aggregator.slot_error(slot).await,
            None => None,
        }
    }

    /// Bounded host-level error feed
    pub async fn host_errors(&self) -> Vec<String> {
        match &self.inner.read().await.aggregator {
            Some(aggregator) => aggregator.host_errors().await,
            None => Vec::new(),
        }
    }

    /// Fan playback out to every live slot
    pub async fn play_all(&self) -> Result<()> {
        let inner = self.inner.read().await;
        match &inner.sync {
            Some(sync) => {
                sync.play_all().await;
                Ok(())
            }
            None => Err(Error::SessionNotReady("no active adapters".to_string())),
        }
    }

    /// Fan pause out to every live slot
    pub async fn pause_all(&self) -> Result<()> {
        let inner = self.inner.read().await;
        match &inner.sync {
            Some(sync) => {
                sync.pause_all().await;
                Ok(())
            }
            None => Err(Error::SessionNotReady("no active adapters".to_string())),
        }
    }

    /// Fan a seek out to every live slot
    pub async fn seek_all(&self, target: f64) -> Result<()> {
        let inner = self.inner.read().await;
        match &inner.sync {
            Some(sync) => {
                sync.seek_all(target).await;
                Ok(())
            }
            None => Err(Error::SessionNotReady("no active adapters".to_string())),
        }
    }
}
