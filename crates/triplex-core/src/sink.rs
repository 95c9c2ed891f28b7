//! Media sink abstraction
//!
//! A sink is the addressable playback surface one slot attaches its decoding
//! path to. Exactly one sink exists per slot and is never shared. The trait
//! mirrors the small media-element surface the harness samples and drives:
//! transport commands, position/buffer/state queries, and a lifecycle event
//! feed.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Media element network activity codes
pub mod network_state {
    pub const EMPTY: u8 = 0;
    pub const IDLE: u8 = 1;
    pub const LOADING: u8 = 2;
    pub const NO_SOURCE: u8 = 3;
}

/// Media element readiness codes
pub mod ready_state {
    pub const HAVE_NOTHING: u8 = 0;
    pub const HAVE_METADATA: u8 = 1;
    pub const HAVE_CURRENT_DATA: u8 = 2;
    pub const HAVE_FUTURE_DATA: u8 = 3;
    pub const HAVE_ENOUGH_DATA: u8 = 4;
}

/// One contiguous buffered interval in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Forward buffer ahead of the playback position
///
/// Defined as the end of the last buffered range minus the position, clamped
/// to zero. A sink with no ranges reports zero.
pub fn forward_buffer(ranges: &[TimeRange], position: f64) -> f64 {
    match ranges.last() {
        Some(range) => (range.end - position).max(0.0),
        None => 0.0,
    }
}

/// Lifecycle events emitted by a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    /// Resource fetch began
    LoadStart,
    /// Duration and dimensions are known
    LoadedMetadata { duration: f64 },
    /// Enough data to begin playback
    CanPlay,
    /// Playback actually progressing
    Playing,
    /// Playback halted by a pause
    Paused,
    /// Sink-level failure, always surfaced as-is
    Error { code: u8, message: String },
}

/// An exclusive playback surface owned by one slot
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Attach a source URL for direct (native) decoding
    async fn attach_source(&self, url: &str) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek(&self, position: f64) -> Result<()>;

    /// Instantaneous playback position in seconds
    async fn current_time(&self) -> f64;

    /// Buffered intervals in ascending order, possibly empty
    async fn buffered_ranges(&self) -> Vec<TimeRange>;

    async fn network_state(&self) -> u8;

    async fn ready_state(&self) -> u8;

    /// Lifecycle event feed for this sink
    fn subscribe(&self) -> broadcast::Receiver<SinkEvent>;

    /// Release the surface; must be safe to call more than once
    async fn detach(&self) -> Result<()>;
}
