//! Deterministic in-process playback environment
//!
//! Stands in for a real host: fabricated sinks that behave like media
//! surfaces, and engine instances that announce a fixed variant ladder over
//! the usual event feed. Playback only moves when something drives the
//! clock, either a test calling [`SimEnvironment::advance`] directly or the
//! CLI running [`SimEnvironment::start_clock`] for wall-time pacing. That
//! makes every run reproducible on hosts with no media pipeline at all.

use crate::capability::PlaybackEnvironment;
use crate::engine::{AdaptiveEngine, EngineConfig, EngineEvent, FaultKind, Level};
use crate::error::{Error, Result};
use crate::sink::{network_state, ready_state, MediaSink, SinkEvent, TimeRange};
use crate::types::SlotKind;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

/// Media duration reported by sim sinks, in seconds
pub const SIM_DURATION: f64 = 600.0;

/// How far past the playhead the sim keeps the buffer filled
const BUFFER_AHEAD: f64 = 10.0;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Tick size for the real-time clock task
const CLOCK_TICK: Duration = Duration::from_millis(250);

/// Knobs for a simulated host
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Host decodes HLS without an engine
    pub native_hls: bool,
    /// The adaptive engine can run here
    pub engine: bool,
    /// Variant ladder engines announce at manifest time
    pub ladder: Vec<Level>,
    /// Delay between `load_source` and the manifest events
    pub manifest_delay: Duration,
    pub user_agent: String,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            native_hls: true,
            engine: true,
            ladder: default_ladder(),
            manifest_delay: Duration::from_millis(20),
            user_agent: "TriplexSim/0.1".to_string(),
        }
    }
}

/// Four-step ladder from 360p to 1080p
pub fn default_ladder() -> Vec<Level> {
    vec![
        Level::new(500_000, 640, 360),
        Level::new(1_200_000, 960, 540),
        Level::new(2_500_000, 1280, 720),
        Level::new(5_000_000, 1920, 1080),
    ]
}

/// A simulated host environment
///
/// Keeps a registry of the sinks and engines it has handed out so tests and
/// the CLI can reach into a slot's pipeline after the harness has built it.
/// Creating a new sink or engine for a slot replaces the registry entry, so
/// lookups always see the current session's instances.
pub struct SimEnvironment {
    options: SimOptions,
    sinks: std::sync::Mutex<BTreeMap<SlotKind, Arc<SimSink>>>,
    engines: std::sync::Mutex<BTreeMap<SlotKind, Arc<SimEngine>>>,
}

impl SimEnvironment {
    pub fn new(options: SimOptions) -> Self {
        Self {
            options,
            sinks: std::sync::Mutex::new(BTreeMap::new()),
            engines: std::sync::Mutex::new(BTreeMap::new()),
        }
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    /// The most recently created sink for `slot`
    pub fn sink(&self, slot: SlotKind) -> Option<Arc<SimSink>> {
        self.sinks.lock().unwrap().get(&slot).cloned()
    }

    /// The most recently created engine for `slot`
    pub fn engine(&self, slot: SlotKind) -> Option<Arc<SimEngine>> {
        self.engines.lock().unwrap().get(&slot).cloned()
    }

    /// Move every playing sink forward by `seconds`
    pub async fn advance(&self, seconds: f64) {
        let sinks: Vec<Arc<SimSink>> = self.sinks.lock().unwrap().values().cloned().collect();
        for sink in sinks {
            sink.advance(seconds).await;
        }
    }

    /// Drive playback against wall time until the returned task is aborted
    pub fn start_clock(self: &Arc<Self>) -> JoinHandle<()> {
        let env = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLOCK_TICK);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                env.advance(CLOCK_TICK.as_secs_f64()).await;
            }
        })
    }
}

impl PlaybackEnvironment for SimEnvironment {
    fn supports_native_hls(&self) -> bool {
        self.options.native_hls
    }

    fn supports_engine(&self) -> bool {
        self.options.engine
    }

    fn user_agent(&self) -> String {
        self.options.user_agent.clone()
    }

    fn create_sink(&self, slot: SlotKind) -> Result<Arc<dyn MediaSink>> {
        let sink = Arc::new(SimSink::new(slot));
        self.sinks.lock().unwrap().insert(slot, sink.clone());
        debug!(slot = %slot, "sim sink created");
        Ok(sink)
    }

    fn create_engine(
        &self,
        slot: SlotKind,
        config: EngineConfig,
    ) -> Result<Arc<dyn AdaptiveEngine>> {
        if !self.options.engine {
            return Err(Error::Unsupported { slot });
        }
        let engine = Arc::new(SimEngine::new(
            slot,
            config,
            self.options.ladder.clone(),
            self.options.manifest_delay,
        ));
        self.engines.lock().unwrap().insert(slot, engine.clone());
        debug!(slot = %slot, "sim engine created");
        Ok(engine)
    }
}

#[derive(Debug)]
struct SinkState {
    src: Option<String>,
    playing: bool,
    position: f64,
    duration: f64,
    buffered: Vec<TimeRange>,
    network_state: u8,
    ready_state: u8,
}

impl Default for SinkState {
    fn default() -> Self {
        Self {
            src: None,
            playing: false,
            position: 0.0,
            duration: 0.0,
            buffered: Vec::new(),
            network_state: network_state::EMPTY,
            ready_state: ready_state::HAVE_NOTHING,
        }
    }
}

/// Simulated media surface
///
/// Mirrors the observable contract of a real sink: attach emits the load
/// event chain, transport commands fail until a source is attached, and
/// detach is terminal until the next attach.
pub struct SimSink {
    slot: SlotKind,
    state: RwLock<SinkState>,
    events: broadcast::Sender<SinkEvent>,
}

impl SimSink {
    pub fn new(slot: SlotKind) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            slot,
            state: RwLock::new(SinkState::default()),
            events,
        }
    }

    /// Place the playhead directly, bypassing the playing check
    pub async fn set_position(&self, position: f64) {
        let mut state = self.state.write().await;
        state.position = position;
    }

    /// Move the playhead if playing and keep the buffer ahead of it
    pub async fn advance(&self, seconds: f64) {
        let mut state = self.state.write().await;
        if !state.playing {
            return;
        }
        state.position = (state.position + seconds).min(state.duration);
        let target = (state.position + BUFFER_AHEAD).min(state.duration);
        if let Some(last) = state.buffered.last_mut() {
            if target > last.end {
                last.end = target;
            }
        }
    }

    /// Emit a surface-level error event
    pub async fn fail(&self, code: u8, message: &str) {
        self.emit(SinkEvent::Error {
            code,
            message: message.to_string(),
        })
        .await;
    }

    /// Emit an arbitrary event on this sink's feed
    pub async fn emit(&self, event: SinkEvent) {
        let _ = self.events.send(event);
    }

    pub async fn is_attached(&self) -> bool {
        self.state.read().await.src.is_some()
    }

    fn detached_error(&self) -> Error {
        Error::Internal(format!("sink for slot {} has no attached source", self.slot))
    }
}

#[async_trait]
impl MediaSink for SimSink {
    async fn attach_source(&self, url: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.src = Some(url.to_string());
            state.network_state = network_state::LOADING;
        }
        let _ = self.events.send(SinkEvent::LoadStart);

        {
            let mut state = self.state.write().await;
            state.duration = SIM_DURATION;
            state.position = 0.0;
            state.buffered = vec![TimeRange::new(0.0, BUFFER_AHEAD)];
            state.ready_state = ready_state::HAVE_FUTURE_DATA;
            state.network_state = network_state::IDLE;
        }
        let _ = self.events.send(SinkEvent::LoadedMetadata {
            duration: SIM_DURATION,
        });
        let _ = self.events.send(SinkEvent::CanPlay);
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.src.is_none() {
                return Err(self.detached_error());
            }
            state.playing = true;
            state.ready_state = ready_state::HAVE_ENOUGH_DATA;
        }
        let _ = self.events.send(SinkEvent::Playing);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.src.is_none() {
                return Err(self.detached_error());
            }
            state.playing = false;
        }
        let _ = self.events.send(SinkEvent::Paused);
        Ok(())
    }

    async fn seek(&self, position: f64) -> Result<()> {
        let mut state = self.state.write().await;
        if state.src.is_none() {
            return Err(self.detached_error());
        }
        let clamped = position.clamp(0.0, state.duration);
        state.position = clamped;
        let end = (clamped + BUFFER_AHEAD).min(state.duration);
        state.buffered = vec![TimeRange::new(clamped, end)];
        Ok(())
    }

    async fn current_time(&self) -> f64 {
        self.state.read().await.position
    }

    async fn buffered_ranges(&self) -> Vec<TimeRange> {
        self.state.read().await.buffered.clone()
    }

    async fn network_state(&self) -> u8 {
        self.state.read().await.network_state
    }

    async fn ready_state(&self) -> u8 {
        self.state.read().await.ready_state
    }

    fn subscribe(&self) -> broadcast::Receiver<SinkEvent> {
        self.events.subscribe()
    }

    async fn detach(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = SinkState::default();
        Ok(())
    }
}

/// Simulated adaptive engine instance
///
/// `load_source` schedules the manifest feed after the configured delay;
/// recovery entry points count their invocations so fault handling can be
/// asserted from outside.
#[derive(Debug)]
pub struct SimEngine {
    slot: SlotKind,
    config: EngineConfig,
    ladder: Vec<Level>,
    manifest_delay: Duration,
    url: RwLock<Option<String>>,
    events: broadcast::Sender<EngineEvent>,
    destroyed: AtomicBool,
    start_loads: AtomicUsize,
    recovers: AtomicUsize,
}

impl SimEngine {
    pub fn new(
        slot: SlotKind,
        config: EngineConfig,
        ladder: Vec<Level>,
        manifest_delay: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            slot,
            config,
            ladder,
            manifest_delay,
            url: RwLock::new(None),
            events,
            destroyed: AtomicBool::new(false),
            start_loads: AtomicUsize::new(0),
            recovers: AtomicUsize::new(0),
        }
    }

    /// The profile this instance was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Times `start_load` has been invoked since creation
    pub fn start_load_calls(&self) -> usize {
        self.start_loads.load(Ordering::SeqCst)
    }

    /// Times `recover_media_error` has been invoked since creation
    pub fn recover_calls(&self) -> usize {
        self.recovers.load(Ordering::SeqCst)
    }

    /// Emit an arbitrary event on this instance's feed
    pub async fn inject(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    /// Emit a classified fault
    pub async fn inject_fault(&self, kind: FaultKind, fatal: bool, details: &str) {
        self.inject(EngineEvent::Error {
            kind,
            fatal,
            details: details.to_string(),
        })
        .await;
    }

    fn destroyed_error(&self) -> Error {
        Error::EngineFatal {
            slot: self.slot,
            details: "engine instance destroyed".to_string(),
        }
    }
}

#[async_trait]
impl AdaptiveEngine for SimEngine {
    async fn load_source(&self, url: &str) -> Result<()> {
        if self.is_destroyed() {
            return Err(self.destroyed_error());
        }
        *self.url.write().await = Some(url.to_string());

        let events = self.events.clone();
        let ladder = self.ladder.clone();
        let delay = self.manifest_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(EngineEvent::ManifestParsed { levels: ladder });
            let _ = events.send(EngineEvent::LevelSwitched { level: 0 });
            let _ = events.send(EngineEvent::FragLoaded);
        });
        Ok(())
    }

    async fn attach_media(&self, sink: Arc<dyn MediaSink>) -> Result<()> {
        if self.is_destroyed() {
            return Err(self.destroyed_error());
        }
        let url = match self.url.read().await.clone() {
            Some(url) => url,
            None => {
                return Err(Error::Internal(
                    "attach_media called before load_source".to_string(),
                ))
            }
        };
        sink.attach_source(&url).await?;
        let _ = self.events.send(EngineEvent::MediaAttached);
        Ok(())
    }

    async fn start_load(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(self.destroyed_error());
        }
        self.start_loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recover_media_error(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(self.destroyed_error());
        }
        self.recovers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
