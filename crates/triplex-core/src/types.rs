//! Core types for the comparison harness

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a comparison session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback slot labels
///
/// Each slot is one independent pipeline under comparison. The label names the
/// intended configuration, not necessarily the technology that ends up serving
/// it (see [`PlayerMetrics::player_type`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Native-preferred slot (direct source attach when the host can decode HLS)
    Native,
    /// Adaptive engine with conservative buffering config
    Standard,
    /// Adaptive engine with tuned bandwidth-estimation config
    Abr,
}

impl SlotKind {
    /// Panel heading used by host views
    pub fn panel_title(&self) -> &'static str {
        match self {
            SlotKind::Native => "Native HLS",
            SlotKind::Standard => "Engine Standard",
            SlotKind::Abr => "Engine ABR",
        }
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotKind::Native => write!(f, "native"),
            SlotKind::Standard => write!(f, "standard"),
            SlotKind::Abr => write!(f, "abr"),
        }
    }
}

/// Which technology actually serves a slot
///
/// Diverges from the slot label when a fallback occurred: a native slot reports
/// `Engine` if native decoding is unavailable and the adaptive engine stepped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerTech {
    Native,
    Engine,
    Unsupported,
}

impl std::fmt::Display for PlayerTech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerTech::Native => write!(f, "native"),
            PlayerTech::Engine => write!(f, "engine"),
            PlayerTech::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// How many pipelines a session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessMode {
    /// One native-preferred slot
    Single,
    /// Native vs standard engine
    Dual,
    /// Native vs standard engine vs ABR-tuned engine
    Triple,
}

impl HarnessMode {
    /// Slot set this mode initializes, in panel order
    pub fn slots(&self) -> &'static [SlotKind] {
        match self {
            HarnessMode::Single => &[SlotKind::Native],
            HarnessMode::Dual => &[SlotKind::Native, SlotKind::Standard],
            HarnessMode::Triple => &[SlotKind::Native, SlotKind::Standard, SlotKind::Abr],
        }
    }

    /// Parse from CLI-style string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" => Some(HarnessMode::Single),
            "dual" => Some(HarnessMode::Dual),
            "triple" => Some(HarnessMode::Triple),
            _ => None,
        }
    }
}

impl std::fmt::Display for HarnessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarnessMode::Single => write!(f, "single"),
            HarnessMode::Dual => write!(f, "dual"),
            HarnessMode::Triple => write!(f, "triple"),
        }
    }
}

/// Maximum retained entries in a slot's rolling event log
pub const EVENT_LOG_CAPACITY: usize = 10;

/// Per-slot playback metrics
///
/// One instance exists per configured slot for the lifetime of a session and is
/// replaced wholesale when a new session begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMetrics {
    /// Milliseconds from initialization start to the first manifest/ready signal
    pub load_time_ms: u64,
    /// Last-sampled playback position in seconds
    pub current_time: f64,
    /// Last-sampled forward buffer ahead of the position, in seconds
    pub buffered: f64,
    /// Human-readable current rendition descriptor
    pub quality: String,
    /// Current rendition's nominal bitrate in bits/sec (0 = unknown)
    pub bitrate: u64,
    /// Technology actually serving this slot
    pub player_type: PlayerTech,
    /// Last observed play/pause transition
    pub is_playing: bool,
    /// Raw media-element network state code (0-4)
    pub network_state: u8,
    /// Raw media-element ready state code (0-4)
    pub ready_state: u8,
    /// Rolling log of timestamped lifecycle events, oldest first
    pub events: Vec<String>,
}

impl Default for PlayerMetrics {
    fn default() -> Self {
        Self {
            load_time_ms: 0,
            current_time: 0.0,
            buffered: 0.0,
            quality: "Unknown".to_string(),
            bitrate: 0,
            player_type: PlayerTech::Unsupported,
            is_playing: false,
            network_state: 0,
            ready_state: 0,
            events: Vec::new(),
        }
    }
}

impl PlayerMetrics {
    /// Append an event line, evicting the oldest entry once the log is full
    pub fn push_event(&mut self, line: String) {
        while self.events.len() >= EVENT_LOG_CAPACITY {
            self.events.remove(0);
        }
        self.events.push(line);
    }
}

/// Shallow partial update into one slot's metrics
///
/// `None` fields are left untouched by [`MetricsUpdate::apply`], so pollers and
/// event handlers can each write only the fields they own.
#[derive(Debug, Clone, Default)]
pub struct MetricsUpdate {
    pub load_time_ms: Option<u64>,
    pub current_time: Option<f64>,
    pub buffered: Option<f64>,
    pub quality: Option<String>,
    pub bitrate: Option<u64>,
    pub player_type: Option<PlayerTech>,
    pub is_playing: Option<bool>,
    pub network_state: Option<u8>,
    pub ready_state: Option<u8>,
}

impl MetricsUpdate {
    /// Merge the present fields into `metrics`
    pub fn apply(self, metrics: &mut PlayerMetrics) {
        if let Some(v) = self.load_time_ms {
            metrics.load_time_ms = v;
        }
        if let Some(v) = self.current_time {
            metrics.current_time = v;
        }
        if let Some(v) = self.buffered {
            metrics.buffered = v;
        }
        if let Some(v) = self.quality {
            metrics.quality = v;
        }
        if let Some(v) = self.bitrate {
            metrics.bitrate = v;
        }
        if let Some(v) = self.player_type {
            metrics.player_type = v;
        }
        if let Some(v) = self.is_playing {
            metrics.is_playing = v;
        }
        if let Some(v) = self.network_state {
            metrics.network_state = v;
        }
        if let Some(v) = self.ready_state {
            metrics.ready_state = v;
        }
    }
}

/// Consistent cross-slot view published by the aggregator
///
/// Consumers must treat a snapshot as immutable between publications; each
/// mutation in the aggregator produces a fresh one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Slot name to current metrics
    pub slots: BTreeMap<SlotKind, PlayerMetrics>,
}

impl Snapshot {
    /// Metrics for one slot, if configured
    pub fn get(&self, slot: SlotKind) -> Option<&PlayerMetrics> {
        self.slots.get(&slot)
    }

    /// Configured slots in panel order
    pub fn slot_kinds(&self) -> Vec<SlotKind> {
        self.slots.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
