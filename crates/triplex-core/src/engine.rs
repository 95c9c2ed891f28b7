//! Adaptive engine abstraction
//!
//! The adaptive-streaming engine is treated as an opaque collaborator with a
//! known event and error surface plus a small set of recovery operations. The
//! harness never looks inside its ABR or segment-fetch machinery; it only
//! configures an instance per slot, listens, and reacts.

use crate::error::Result;
use crate::sink::MediaSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One rendition in the engine's quality ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Nominal bitrate in bits/sec
    pub bitrate: u64,
    pub width: u32,
    pub height: u32,
}

impl Level {
    pub fn new(bitrate: u64, width: u32, height: u32) -> Self {
        Self {
            bitrate,
            width,
            height,
        }
    }
}

/// Fatal fault categories reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Manifest or segment fetch failure
    Network,
    /// Decode or buffer-append failure
    Media,
    /// Anything else; not recoverable in place
    Other,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::Network => write!(f, "network"),
            FaultKind::Media => write!(f, "media"),
            FaultKind::Other => write!(f, "other"),
        }
    }
}

/// Events emitted by an engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Engine bound itself to a sink
    MediaAttached,
    /// Master playlist parsed; the quality ladder is known
    ManifestParsed { levels: Vec<Level> },
    /// Rendition in use changed; `level` is an index into the ladder, or -1
    /// when the engine is choosing automatically
    LevelSwitched { level: i32 },
    /// One media segment finished buffering
    FragLoaded,
    /// Engine fault; `fatal` faults trigger the recovery policy
    Error {
        kind: FaultKind,
        fatal: bool,
        details: String,
    },
}

/// Tuning knobs passed to an engine instance at construction
///
/// Field meanings follow the engine's own configuration surface. The presets
/// below are the fixed per-slot configurations under comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run demuxing in a worker
    pub enable_worker: bool,
    pub low_latency_mode: bool,
    /// Seconds of media retained behind the playback position
    pub back_buffer_length: u32,
    /// Forward buffer target in seconds
    pub max_buffer_length: u32,
    /// Hard forward buffer ceiling in seconds
    pub max_max_buffer_length: u32,
    /// Cap the rendition when the decoder drops frames
    pub cap_level_on_fps_drop: bool,
    /// Cap the rendition to the sink's display size
    pub cap_level_to_player_size: bool,
    /// Fast EWMA window (seconds) for live bandwidth estimation
    pub abr_ewma_fast_live: f64,
    /// Slow EWMA window (seconds) for live bandwidth estimation
    pub abr_ewma_slow_live: f64,
    pub abr_ewma_fast_vod: f64,
    pub abr_ewma_slow_vod: f64,
    /// Starting bandwidth estimate in bits/sec before any samples exist
    pub abr_ewma_default_estimate: u64,
    /// Fraction of the estimate usable when switching down
    pub abr_bandwidth_factor: f64,
    /// Fraction of the estimate usable when switching up
    pub abr_bandwidth_up_factor: f64,
    /// Max seconds of rebuffer risk tolerated before an emergency down-switch
    pub max_starvation_delay: u32,
    /// Max seconds tolerated for the first load before down-switching
    pub max_loading_delay: u32,
}

impl EngineConfig {
    /// Conservative buffering profile for the standard slot
    pub fn standard() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: false,
            back_buffer_length: 90,
            max_buffer_length: 300,
            max_max_buffer_length: 600,
            cap_level_on_fps_drop: false,
            cap_level_to_player_size: false,
            abr_ewma_fast_live: 3.0,
            abr_ewma_slow_live: 9.0,
            abr_ewma_fast_vod: 3.0,
            abr_ewma_slow_vod: 9.0,
            abr_ewma_default_estimate: 500_000,
            abr_bandwidth_factor: 0.95,
            abr_bandwidth_up_factor: 0.7,
            max_starvation_delay: 4,
            max_loading_delay: 4,
        }
    }

    /// Aggressive bitrate-switching profile for the ABR slot
    ///
    /// Tighter buffers and explicit level capping so adaptive behavior
    /// diverges visibly from the standard slot on the same stream.
    pub fn abr_tuned() -> Self {
        Self {
            low_latency_mode: true,
            back_buffer_length: 30,
            max_buffer_length: 120,
            max_max_buffer_length: 300,
            cap_level_on_fps_drop: true,
            cap_level_to_player_size: true,
            ..Self::standard()
        }
    }

    /// Profile for an engine standing in on the native slot
    ///
    /// Worker disabled so the fallback instance does not contend with the
    /// primary engine instances.
    pub fn native_fallback() -> Self {
        Self {
            enable_worker: false,
            ..Self::standard()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// A configured adaptive engine instance owned by one slot
#[async_trait]
pub trait AdaptiveEngine: std::fmt::Debug + Send + Sync {
    /// Begin fetching and parsing the given master playlist
    async fn load_source(&self, url: &str) -> Result<()>;

    /// Bind the engine's output to a sink
    async fn attach_media(&self, sink: Arc<dyn MediaSink>) -> Result<()>;

    /// Resume loading after a fatal network fault
    async fn start_load(&self) -> Result<()>;

    /// In-place recovery from a fatal media fault
    async fn recover_media_error(&self) -> Result<()>;

    /// Tear the instance down; must be safe to call more than once
    async fn destroy(&self);

    /// Event feed for this instance
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}
