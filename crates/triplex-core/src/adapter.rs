//! Per-slot engine adapters
//!
//! An adapter brings one playback slot from uninitialized to playing or
//! failed, and keeps surfacing that slot's state to the aggregator for the
//! life of the session. It owns the slot's sink, the engine instance when one
//! is in use, and the background tasks that translate events and periodic
//! samples into metrics writes.
//!
//! Two update sources feed the same merge path and stay independent: discrete
//! lifecycle events from the sink and engine feeds, and a fixed 1 second poll
//! of position, buffer and element state, which drift continuously even when
//! no event fires.

use crate::aggregator::MetricsAggregator;
use crate::capability::PlaybackEnvironment;
use crate::engine::{AdaptiveEngine, EngineConfig, EngineEvent, FaultKind, Level};
use crate::error::{Error, Result};
use crate::sink::{forward_buffer, MediaSink, SinkEvent};
use crate::types::{MetricsUpdate, PlayerTech, SlotKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Interval between periodic position/buffer samples
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One slot's playback pipeline
pub struct SlotAdapter {
    slot: SlotKind,
    aggregator: Arc<MetricsAggregator>,
    sink: Arc<dyn MediaSink>,
    engine: Mutex<Option<Arc<dyn AdaptiveEngine>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl SlotAdapter {
    /// Bring the slot up against `url` inside `env`
    ///
    /// Decides the serving technology for this slot: the native-preferred
    /// slot attaches the source directly when the host decodes HLS itself,
    /// falls back to an engine instance when only the engine is available,
    /// and fails with `Unsupported` when neither path exists. Engine slots
    /// require the engine. Note the fallback keeps reporting under the
    /// native slot label; `player_type` is what records which technology
    /// actually serves it.
    #[instrument(skip(url, env, aggregator), fields(slot = %slot))]
    pub async fn initialize(
        slot: SlotKind,
        url: &str,
        env: &dyn PlaybackEnvironment,
        aggregator: Arc<MetricsAggregator>,
    ) -> Result<Arc<Self>> {
        let start = Instant::now();
        aggregator.set_loading(slot, true).await;
        aggregator.clear_slot_error(slot).await;
        aggregator.record_event(slot, init_line(slot)).await;

        match Self::bring_up(slot, url, env, &aggregator, start).await {
            Ok(adapter) => Ok(adapter),
            Err(e) => {
                let message = match &e {
                    Error::Unsupported { .. } => unsupported_text(slot).to_string(),
                    other => other.to_string(),
                };
                aggregator
                    .record_event(slot, init_error_line(slot, &message))
                    .await;
                aggregator.set_slot_error(slot, &message).await;
                aggregator
                    .push_host_error(format!("{}: {}", slot, message))
                    .await;
                aggregator
                    .update(
                        slot,
                        MetricsUpdate {
                            player_type: Some(PlayerTech::Unsupported),
                            load_time_ms: Some(elapsed_ms(start)),
                            ..Default::default()
                        },
                    )
                    .await;
                aggregator.set_loading(slot, false).await;
                Err(e)
            }
        }
    }

    async fn bring_up(
        slot: SlotKind,
        url: &str,
        env: &dyn PlaybackEnvironment,
        aggregator: &Arc<MetricsAggregator>,
        start: Instant,
    ) -> Result<Arc<Self>> {
        let sink = env.create_sink(slot)?;
        // Subscribe before attaching so nothing emitted during setup is lost
        let sink_rx = sink.subscribe();
        let mut engine: Option<Arc<dyn AdaptiveEngine>> = None;
        let mut engine_rx: Option<broadcast::Receiver<EngineEvent>> = None;

        match slot {
            SlotKind::Native => {
                if env.supports_native_hls() {
                    aggregator
                        .record_event(slot, "Using native HLS support")
                        .await;
                    sink.attach_source(url).await?;
                    aggregator
                        .update(
                            slot,
                            MetricsUpdate {
                                player_type: Some(PlayerTech::Native),
                                load_time_ms: Some(elapsed_ms(start)),
                                ..Default::default()
                            },
                        )
                        .await;
                } else if env.supports_engine() {
                    aggregator
                        .record_event(slot, "Native HLS not supported - fallback to engine in native slot")
                        .await;
                    // The fallback instance runs without a worker so it does
                    // not contend with the primary engine slots. Its own
                    // event feed is left unconsumed; this slot's observable
                    // behavior stays the sink feed, as on the direct path.
                    let fallback = env.create_engine(slot, EngineConfig::native_fallback())?;
                    fallback.load_source(url).await?;
                    fallback.attach_media(sink.clone()).await?;
                    aggregator
                        .update(
                            slot,
                            MetricsUpdate {
                                player_type: Some(PlayerTech::Engine),
                                load_time_ms: Some(elapsed_ms(start)),
                                ..Default::default()
                            },
                        )
                        .await;
                    aggregator
                        .record_event(slot, "Engine fallback initialized")
                        .await;
                    engine = Some(fallback);
                } else {
                    return Err(Error::Unsupported { slot });
                }
            }
            SlotKind::Standard | SlotKind::Abr => {
                if !env.supports_engine() {
                    return Err(Error::Unsupported { slot });
                }
                let config = if slot == SlotKind::Abr {
                    EngineConfig::abr_tuned()
                } else {
                    EngineConfig::standard()
                };
                let instance = env.create_engine(slot, config)?;
                engine_rx = Some(instance.subscribe());
                instance.load_source(url).await?;
                instance.attach_media(sink.clone()).await?;
                engine = Some(instance);
            }
        }

        let adapter = Arc::new(Self {
            slot,
            aggregator: aggregator.clone(),
            sink: sink.clone(),
            engine: Mutex::new(engine.clone()),
            tasks: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });

        let mut tasks = vec![
            spawn_sink_pump(slot, sink_rx, aggregator.clone()),
            spawn_poller(slot, sink, aggregator.clone()),
        ];
        if let (Some(rx), Some(instance)) = (engine_rx, engine) {
            tasks.push(spawn_engine_pump(slot, instance, rx, aggregator.clone(), start));
        }
        *adapter.tasks.lock().await = tasks;

        debug!(slot = %slot, "adapter attached");
        Ok(adapter)
    }

    pub fn slot(&self) -> SlotKind {
        self.slot
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub async fn play(&self) -> Result<()> {
        self.sink.play().await
    }

    pub async fn pause(&self) -> Result<()> {
        self.sink.pause().await
    }

    pub async fn seek(&self, position: f64) -> Result<()> {
        self.sink.seek(position).await
    }

    /// Stop polling, destroy the engine instance, release the sink
    ///
    /// Safe to call more than once; only the first call has any effect. Must
    /// complete before a new adapter is created for the same slot.
    #[instrument(skip(self), fields(slot = %self.slot))]
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        if let Some(engine) = self.engine.lock().await.take() {
            engine.destroy().await;
        }
        if let Err(e) = self.sink.detach().await {
            warn!(slot = %self.slot, error = %e, "sink detach failed");
        }
        debug!(slot = %self.slot, "adapter disposed");
    }
}

fn spawn_sink_pump(
    slot: SlotKind,
    mut rx: broadcast::Receiver<SinkEvent>,
    aggregator: Arc<MetricsAggregator>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => handle_sink_event(slot, event, &aggregator).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(slot = %slot, missed, "sink event feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn handle_sink_event(slot: SlotKind, event: SinkEvent, aggregator: &MetricsAggregator) {
    match event {
        // Resource-level events are only narrated on the native slot; engine
        // slots get their narrative from the engine feed instead
        SinkEvent::LoadStart => {
            if slot == SlotKind::Native {
                aggregator.record_event(slot, "Load start").await;
            }
        }
        SinkEvent::LoadedMetadata { .. } => {
            if slot == SlotKind::Native {
                aggregator.record_event(slot, "Metadata loaded").await;
            }
        }
        SinkEvent::CanPlay => {
            aggregator.set_loading(slot, false).await;
            aggregator.record_event(slot, canplay_line(slot)).await;
        }
        SinkEvent::Playing => {
            aggregator
                .update(
                    slot,
                    MetricsUpdate {
                        is_playing: Some(true),
                        ..Default::default()
                    },
                )
                .await;
            aggregator.record_event(slot, playing_line(slot)).await;
        }
        SinkEvent::Paused => {
            aggregator
                .update(
                    slot,
                    MetricsUpdate {
                        is_playing: Some(false),
                        ..Default::default()
                    },
                )
                .await;
            aggregator.record_event(slot, paused_line(slot)).await;
        }
        SinkEvent::Error { code, message } => {
            if slot == SlotKind::Native {
                let text = format!("Video error: {} - {}", code, message);
                aggregator.set_slot_error(slot, &text).await;
                aggregator
                    .record_event(slot, format!("Error: {}", text))
                    .await;
                aggregator
                    .push_host_error(format!("{}: {}", slot, text))
                    .await;
            }
        }
    }
}

fn spawn_engine_pump(
    slot: SlotKind,
    engine: Arc<dyn AdaptiveEngine>,
    mut rx: broadcast::Receiver<EngineEvent>,
    aggregator: Arc<MetricsAggregator>,
    start: Instant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Ladder cache so level switches can resolve a nominal bitrate
        let mut levels: Vec<Level> = Vec::new();
        loop {
            match rx.recv().await {
                Ok(event) => {
                    handle_engine_event(slot, event, &engine, &aggregator, start, &mut levels)
                        .await
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(slot = %slot, missed, "engine event feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn handle_engine_event(
    slot: SlotKind,
    event: EngineEvent,
    engine: &Arc<dyn AdaptiveEngine>,
    aggregator: &MetricsAggregator,
    start: Instant,
    levels: &mut Vec<Level>,
) {
    match event {
        EngineEvent::MediaAttached => {}
        EngineEvent::ManifestParsed { levels: parsed } => {
            let count = parsed.len();
            *levels = parsed;
            aggregator
                .record_event(slot, manifest_line(slot, count))
                .await;
            aggregator
                .update(
                    slot,
                    MetricsUpdate {
                        player_type: Some(PlayerTech::Engine),
                        quality: Some(manifest_quality(slot, count)),
                        load_time_ms: Some(elapsed_ms(start)),
                        ..Default::default()
                    },
                )
                .await;
        }
        EngineEvent::LevelSwitched { level } => {
            let label = level_label(level);
            let bitrate = if level >= 0 {
                levels.get(level as usize).map(|l| l.bitrate).unwrap_or(0)
            } else {
                0
            };
            aggregator
                .record_event(slot, level_line(slot, &label, bitrate))
                .await;
            aggregator
                .update(
                    slot,
                    MetricsUpdate {
                        quality: Some(level_quality(slot, &label)),
                        bitrate: Some(bitrate),
                        ..Default::default()
                    },
                )
                .await;
        }
        EngineEvent::FragLoaded => {
            if slot == SlotKind::Standard {
                aggregator.record_event(slot, "Fragment loaded").await;
            }
        }
        EngineEvent::Error {
            kind,
            fatal,
            details,
        } => {
            let text = engine_error_text(slot, kind, &details);
            aggregator
                .record_event(slot, format!("Error: {}", text))
                .await;
            if !fatal {
                return;
            }
            aggregator.set_slot_error(slot, &text).await;
            aggregator
                .push_host_error(format!("{}: {}", slot, text))
                .await;
            match kind {
                FaultKind::Network => {
                    aggregator
                        .record_event(slot, net_recovery_line(slot))
                        .await;
                    if let Err(e) = engine.start_load().await {
                        warn!(slot = %slot, error = %e, "network recovery failed");
                    }
                }
                FaultKind::Media => {
                    aggregator
                        .record_event(slot, media_recovery_line(slot))
                        .await;
                    if let Err(e) = engine.recover_media_error().await {
                        warn!(slot = %slot, error = %e, "media recovery failed");
                    }
                }
                FaultKind::Other => {
                    aggregator
                        .record_event(slot, fatal_destroy_line(slot))
                        .await;
                    engine.destroy().await;
                }
            }
        }
    }
}

fn spawn_poller(
    slot: SlotKind,
    sink: Arc<dyn MediaSink>,
    aggregator: Arc<MetricsAggregator>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let position = sink.current_time().await;
            let ranges = sink.buffered_ranges().await;
            aggregator
                .update(
                    slot,
                    MetricsUpdate {
                        current_time: Some(position),
                        buffered: Some(forward_buffer(&ranges, position)),
                        network_state: Some(sink.network_state().await),
                        ready_state: Some(sink.ready_state().await),
                        ..Default::default()
                    },
                )
                .await;
        }
    })
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn level_label(level: i32) -> String {
    if level < 0 {
        "Auto".to_string()
    } else {
        level.to_string()
    }
}

fn init_line(slot: SlotKind) -> &'static str {
    match slot {
        SlotKind::Native => "Initializing native player",
        SlotKind::Standard => "Initializing engine player",
        SlotKind::Abr => "Initializing ABR engine player",
    }
}

fn unsupported_text(slot: SlotKind) -> &'static str {
    match slot {
        SlotKind::Native => "Neither native HLS nor the adaptive engine is supported",
        SlotKind::Standard => "Adaptive engine is not supported",
        SlotKind::Abr => "Adaptive engine is not supported for ABR player",
    }
}

fn init_error_line(slot: SlotKind, message: &str) -> String {
    match slot {
        SlotKind::Abr => format!("ABR initialization error: {}", message),
        _ => format!("Initialization error: {}", message),
    }
}

fn canplay_line(slot: SlotKind) -> &'static str {
    match slot {
        SlotKind::Abr => "ABR player ready",
        _ => "Can play",
    }
}

fn playing_line(slot: SlotKind) -> &'static str {
    match slot {
        SlotKind::Abr => "ABR playback started",
        _ => "Playing started",
    }
}

fn paused_line(slot: SlotKind) -> &'static str {
    match slot {
        SlotKind::Abr => "ABR playback paused",
        _ => "Paused",
    }
}

fn manifest_line(slot: SlotKind, count: usize) -> String {
    match slot {
        SlotKind::Abr => format!("Manifest parsed: {} levels, ABR enabled", count),
        _ => format!("Manifest parsed: {} levels", count),
    }
}

fn manifest_quality(slot: SlotKind, count: usize) -> String {
    match slot {
        SlotKind::Abr => format!("ABR ({} levels)", count),
        _ => format!("{} levels available", count),
    }
}

fn level_line(slot: SlotKind, label: &str, bitrate: u64) -> String {
    match slot {
        SlotKind::Abr => format!("ABR switched to: {} ({}kbps)", label, (bitrate + 500) / 1000),
        _ => format!("Level switched to: {}", label),
    }
}

fn level_quality(slot: SlotKind, label: &str) -> String {
    match slot {
        SlotKind::Abr => format!("ABR Level {}", label),
        _ => format!("Level {}", label),
    }
}

fn engine_error_text(slot: SlotKind, kind: FaultKind, details: &str) -> String {
    match slot {
        SlotKind::Abr => format!("ABR engine error: {} - {}", kind, details),
        _ => format!("Engine error: {} - {}", kind, details),
    }
}

fn net_recovery_line(slot: SlotKind) -> &'static str {
    match slot {
        SlotKind::Abr => "ABR attempting network error recovery",
        _ => "Attempting network error recovery",
    }
}

fn media_recovery_line(slot: SlotKind) -> &'static str {
    match slot {
        SlotKind::Abr => "ABR attempting media error recovery",
        _ => "Attempting media error recovery",
    }
}

fn fatal_destroy_line(slot: SlotKind) -> &'static str {
    match slot {
        SlotKind::Abr => "Fatal ABR error - destroying player",
        _ => "Fatal error - destroying player",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimEnvironment, SimOptions};
    use crate::types::SessionId;

    fn aggregator_for(slots: &[SlotKind]) -> Arc<MetricsAggregator> {
        Arc::new(MetricsAggregator::new(SessionId::new(), slots))
    }

    async fn settle() {
        // Paused-clock runs advance through sim delays instantly
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_slot_prefers_direct_attach() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Native]);
        let adapter =
            SlotAdapter::initialize(SlotKind::Native, "https://example.com/a.m3u8", &env, agg.clone())
                .await
                .unwrap();
        settle().await;

        let snapshot = agg.snapshot().await;
        let native = snapshot.get(SlotKind::Native).unwrap();
        assert_eq!(native.player_type, PlayerTech::Native);
        let joined = native.events.join("\n");
        assert!(joined.contains("Initializing native player"));
        assert!(joined.contains("Using native HLS support"));
        assert!(joined.contains("Can play"));
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_slot_falls_back_to_engine() {
        let env = SimEnvironment::new(SimOptions {
            native_hls: false,
            ..Default::default()
        });
        let agg = aggregator_for(&[SlotKind::Native]);
        let adapter =
            SlotAdapter::initialize(SlotKind::Native, "https://example.com/a.m3u8", &env, agg.clone())
                .await
                .unwrap();
        settle().await;

        let snapshot = agg.snapshot().await;
        let native = snapshot.get(SlotKind::Native).unwrap();
        // Slot label stays native; the serving technology is what changes
        assert_eq!(native.player_type, PlayerTech::Engine);
        let joined = native.events.join("\n");
        assert!(joined.contains("fallback to engine in native slot"));
        assert!(joined.contains("Engine fallback initialized"));

        let engine = env.engine(SlotKind::Native).unwrap();
        assert!(!engine.config().enable_worker);
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_slot_never_plays() {
        let env = SimEnvironment::new(SimOptions {
            native_hls: false,
            engine: false,
            ..Default::default()
        });
        let agg = aggregator_for(&[SlotKind::Native]);
        let result =
            SlotAdapter::initialize(SlotKind::Native, "https://example.com/a.m3u8", &env, agg.clone())
                .await;
        assert!(matches!(result, Err(Error::Unsupported { .. })));
        settle().await;

        let snapshot = agg.snapshot().await;
        let native = snapshot.get(SlotKind::Native).unwrap();
        assert_eq!(native.player_type, PlayerTech::Unsupported);
        assert!(!native.is_playing);
        assert!(native
            .events
            .iter()
            .any(|line| line.contains("Neither native HLS nor the adaptive engine is supported")));
        assert!(agg.slot_error(SlotKind::Native).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_slot_reports_manifest_and_levels() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Standard]);
        let adapter = SlotAdapter::initialize(
            SlotKind::Standard,
            "https://example.com/a.m3u8",
            &env,
            agg.clone(),
        )
        .await
        .unwrap();
        settle().await;

        let snapshot = agg.snapshot().await;
        let standard = snapshot.get(SlotKind::Standard).unwrap();
        assert_eq!(standard.player_type, PlayerTech::Engine);
        assert!(standard
            .events
            .iter()
            .any(|line| line.contains("Manifest parsed: 4 levels")));

        let engine = env.engine(SlotKind::Standard).unwrap();
        assert_eq!(engine.config().max_buffer_length, 300);

        // A later switch resolves bitrate from the cached ladder
        engine.inject(EngineEvent::LevelSwitched { level: 2 }).await;
        settle().await;
        let snapshot = agg.snapshot().await;
        let standard = snapshot.get(SlotKind::Standard).unwrap();
        assert_eq!(standard.quality, "Level 2");
        assert_eq!(standard.bitrate, 2_500_000);
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_abr_slot_uses_tuned_profile_and_vocabulary() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Abr]);
        let adapter = SlotAdapter::initialize(
            SlotKind::Abr,
            "https://example.com/a.m3u8",
            &env,
            agg.clone(),
        )
        .await
        .unwrap();
        settle().await;

        let engine = env.engine(SlotKind::Abr).unwrap();
        assert!(engine.config().low_latency_mode);
        assert_eq!(engine.config().max_buffer_length, 120);

        engine.inject(EngineEvent::LevelSwitched { level: -1 }).await;
        settle().await;
        let snapshot = agg.snapshot().await;
        let abr = snapshot.get(SlotKind::Abr).unwrap();
        assert_eq!(abr.quality, "ABR Level Auto");
        assert_eq!(abr.bitrate, 0);
        assert!(abr
            .events
            .iter()
            .any(|line| line.contains("ABR switched to: Auto (0kbps)")));
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_network_fault_triggers_reload() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Standard]);
        let adapter = SlotAdapter::initialize(
            SlotKind::Standard,
            "https://example.com/a.m3u8",
            &env,
            agg.clone(),
        )
        .await
        .unwrap();
        settle().await;

        let engine = env.engine(SlotKind::Standard).unwrap();
        engine
            .inject_fault(FaultKind::Network, true, "manifest load timeout")
            .await;
        settle().await;

        assert_eq!(engine.start_load_calls(), 1);
        assert_eq!(engine.recover_calls(), 0);
        assert!(!engine.is_destroyed());
        let snapshot = agg.snapshot().await;
        let joined = snapshot.get(SlotKind::Standard).unwrap().events.join("\n");
        assert!(joined.contains("Error: Engine error: network - manifest load timeout"));
        assert!(joined.contains("Attempting network error recovery"));
        assert!(agg.slot_error(SlotKind::Standard).await.is_some());
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_media_fault_recovers_in_place() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Abr]);
        let adapter = SlotAdapter::initialize(
            SlotKind::Abr,
            "https://example.com/a.m3u8",
            &env,
            agg.clone(),
        )
        .await
        .unwrap();
        settle().await;

        let engine = env.engine(SlotKind::Abr).unwrap();
        engine
            .inject_fault(FaultKind::Media, true, "buffer append failed")
            .await;
        settle().await;

        assert_eq!(engine.recover_calls(), 1);
        assert!(!engine.is_destroyed());
        let snapshot = agg.snapshot().await;
        let joined = snapshot.get(SlotKind::Abr).unwrap().events.join("\n");
        assert!(joined.contains("ABR attempting media error recovery"));
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_fatal_fault_destroys_engine() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Standard]);
        let adapter = SlotAdapter::initialize(
            SlotKind::Standard,
            "https://example.com/a.m3u8",
            &env,
            agg.clone(),
        )
        .await
        .unwrap();
        settle().await;

        let engine = env.engine(SlotKind::Standard).unwrap();
        engine
            .inject_fault(FaultKind::Other, true, "internal exception")
            .await;
        settle().await;

        assert!(engine.is_destroyed());
        assert_eq!(engine.start_load_calls(), 0);
        let snapshot = agg.snapshot().await;
        let joined = snapshot.get(SlotKind::Standard).unwrap().events.join("\n");
        assert!(joined.contains("Fatal error - destroying player"));
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_fatal_fault_only_logged() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Standard]);
        let adapter = SlotAdapter::initialize(
            SlotKind::Standard,
            "https://example.com/a.m3u8",
            &env,
            agg.clone(),
        )
        .await
        .unwrap();
        settle().await;

        let engine = env.engine(SlotKind::Standard).unwrap();
        engine
            .inject_fault(FaultKind::Network, false, "one segment retry")
            .await;
        settle().await;

        assert_eq!(engine.start_load_calls(), 0);
        assert!(agg.slot_error(SlotKind::Standard).await.is_none());
        let snapshot = agg.snapshot().await;
        let joined = snapshot.get(SlotKind::Standard).unwrap().events.join("\n");
        assert!(joined.contains("Error: Engine error: network - one segment retry"));
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_samples_position_and_buffer() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Native]);
        let adapter =
            SlotAdapter::initialize(SlotKind::Native, "https://example.com/a.m3u8", &env, agg.clone())
                .await
                .unwrap();
        settle().await;

        let sink = env.sink(SlotKind::Native).unwrap();
        sink.play().await.unwrap();
        env.advance(5.0).await;
        // Next poll tick picks the advanced position up
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let snapshot = agg.snapshot().await;
        let native = snapshot.get(SlotKind::Native).unwrap();
        assert!(native.current_time >= 5.0);
        assert!(native.buffered > 0.0);
        assert!(native.ready_state >= 3);
        adapter.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_is_idempotent_and_stops_writes() {
        let env = SimEnvironment::new(SimOptions::default());
        let agg = aggregator_for(&[SlotKind::Native]);
        let adapter =
            SlotAdapter::initialize(SlotKind::Native, "https://example.com/a.m3u8", &env, agg.clone())
                .await
                .unwrap();
        settle().await;

        adapter.dispose().await;
        adapter.dispose().await;
        assert!(adapter.is_disposed());

        let before = agg.snapshot().await;
        let sink = env.sink(SlotKind::Native).unwrap();
        sink.set_position(25.0).await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // No poller or pump survives disposal to observe the new position
        let after = agg.snapshot().await;
        assert_eq!(
            before.get(SlotKind::Native).unwrap().current_time,
            after.get(SlotKind::Native).unwrap().current_time
        );
        assert_eq!(
            before.get(SlotKind::Native).unwrap().events.len(),
            after.get(SlotKind::Native).unwrap().events.len()
        );
    }
}
