//! Triplex Core - Multi-Engine HLS Comparison Harness
//!
//! This crate provides the core functionality for side-by-side playback
//! diagnostics:
//! - Per-slot adapters for native, standard engine, and ABR-tuned playback
//! - Capability detection and native-to-engine fallback
//! - Metrics aggregation with bounded per-slot event logs
//! - Synchronized play/pause/seek across slots
//! - Cross-slot comparison statistics (drift, load time, buffer, bitrate)
//! - Stream catalog, reachability probes, and a persistent result log
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Triplex Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Native    │  │   Standard   │  │     ABR      │          │
//! │  │    Adapter   │  │    Adapter   │  │    Adapter   │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐       ┌─────────────┐        │
//! │                    │   Metrics   │───────│ Comparison  │        │
//! │                    │  Aggregator │       │   Report    │        │
//! │                    └──────┬──────┘       └─────────────┘        │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │    Stream    │  │  Comparison │  │    Result    │           │
//! │  │    Catalog   │  │   Session   │  │    Store     │           │
//! │  └──────────────┘  └─────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod catalog;
pub mod capability;
pub mod sink;
pub mod engine;
pub mod aggregator;
pub mod comparison;
pub mod adapter;
pub mod sync;
pub mod session;
pub mod probe;
pub mod results;
pub mod sim;

pub use error::{Error, Result};
pub use types::*;
pub use catalog::{StreamCategory, StreamConfig, StreamType};
pub use capability::{CapabilityReport, PlaybackEnvironment, PlaybackStrategy};
pub use sink::{MediaSink, SinkEvent, TimeRange};
pub use engine::{AdaptiveEngine, EngineConfig, EngineEvent, FaultKind, Level};
pub use aggregator::{MetricsAggregator, SlotStatus};
pub use comparison::{compare, ComparisonReport};
pub use adapter::SlotAdapter;
pub use sync::SyncController;
pub use session::{ComparisonSession, SessionState};
pub use probe::{ProbeOutcome, ProbeReport, StreamProber};
pub use results::{ResultStore, TestResult, TestStatus};
pub use sim::{SimEnvironment, SimOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the harness library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Triplex Core initialized");
}
