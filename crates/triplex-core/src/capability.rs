//! Host capability detection
//!
//! The harness runs against a host environment that may or may not decode HLS
//! natively and may or may not be able to run the adaptive engine. The
//! [`PlaybackEnvironment`] trait is the seam between the harness and that host:
//! adapters ask it for sinks and engine instances, the capability report asks
//! it what is possible.

use crate::engine::{AdaptiveEngine, EngineConfig};
use crate::error::Result;
use crate::sink::MediaSink;
use crate::types::SlotKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The host a session runs inside
pub trait PlaybackEnvironment: Send + Sync {
    /// Whether sinks can decode HLS without an engine
    fn supports_native_hls(&self) -> bool;

    /// Whether the adaptive engine can run here
    fn supports_engine(&self) -> bool;

    /// Host identity string for reports
    fn user_agent(&self) -> String;

    /// Create the exclusive sink for one slot
    fn create_sink(&self, slot: SlotKind) -> Result<Arc<dyn MediaSink>>;

    /// Create a configured engine instance for one slot
    fn create_engine(&self, slot: SlotKind, config: EngineConfig)
        -> Result<Arc<dyn AdaptiveEngine>>;
}

/// Preferred playback path for this host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStrategy {
    /// Direct decoding, no engine involved
    Native,
    /// Adaptive engine over media-source extensions
    Engine,
    /// Neither path available
    LimitedSupport,
}

impl PlaybackStrategy {
    /// Human-readable recommendation
    pub fn description(&self) -> &'static str {
        match self {
            PlaybackStrategy::Native => "Use native HLS support for best performance",
            PlaybackStrategy::Engine => "Use the adaptive engine for cross-platform compatibility",
            PlaybackStrategy::LimitedSupport => "Limited video support - consider fallback options",
        }
    }
}

impl std::fmt::Display for PlaybackStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStrategy::Native => write!(f, "native"),
            PlaybackStrategy::Engine => write!(f, "engine"),
            PlaybackStrategy::LimitedSupport => write!(f, "limited-support"),
        }
    }
}

/// Coarse form factor guessed from a user agent string
///
/// An Android agent without the Mobile token is a tablet, per the vendor's
/// own convention.
fn device_class(user_agent: &str) -> &'static str {
    if user_agent.contains("iPad")
        || (user_agent.contains("Android") && !user_agent.contains("Mobile"))
    {
        "tablet"
    } else if user_agent.contains("Mobile") || user_agent.contains("iPhone") {
        "mobile"
    } else {
        "desktop"
    }
}

/// What the host can and cannot play
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub native_hls: bool,
    pub engine: bool,
    pub user_agent: String,
    /// Operating system the harness process runs on
    pub os: String,
    pub arch: String,
    pub device_class: String,
    pub strategy: PlaybackStrategy,
}

impl CapabilityReport {
    /// Inspect an environment and derive the preferred strategy
    ///
    /// Native wins when available, then the engine, then limited support.
    pub fn detect(env: &dyn PlaybackEnvironment) -> Self {
        let native_hls = env.supports_native_hls();
        let engine = env.supports_engine();
        let user_agent = env.user_agent();
        let strategy = if native_hls {
            PlaybackStrategy::Native
        } else if engine {
            PlaybackStrategy::Engine
        } else {
            PlaybackStrategy::LimitedSupport
        };
        Self {
            native_hls,
            engine,
            device_class: device_class(&user_agent).to_string(),
            user_agent,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FixedEnv {
        native: bool,
        engine: bool,
    }

    impl PlaybackEnvironment for FixedEnv {
        fn supports_native_hls(&self) -> bool {
            self.native
        }

        fn supports_engine(&self) -> bool {
            self.engine
        }

        fn user_agent(&self) -> String {
            "test-host/1.0".to_string()
        }

        fn create_sink(&self, slot: SlotKind) -> Result<Arc<dyn MediaSink>> {
            Err(Error::SlotNotConfigured { slot })
        }

        fn create_engine(
            &self,
            slot: SlotKind,
            _config: EngineConfig,
        ) -> Result<Arc<dyn AdaptiveEngine>> {
            Err(Error::SlotNotConfigured { slot })
        }
    }

    #[test]
    fn test_strategy_prefers_native() {
        let report = CapabilityReport::detect(&FixedEnv {
            native: true,
            engine: true,
        });
        assert_eq!(report.strategy, PlaybackStrategy::Native);
        assert_eq!(report.device_class, "desktop");
        assert!(!report.os.is_empty());
        assert!(!report.arch.is_empty());
    }

    #[test]
    fn test_device_class_from_user_agent() {
        assert_eq!(
            device_class("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"),
            "mobile"
        );
        assert_eq!(
            device_class("Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile Safari"),
            "mobile"
        );
        assert_eq!(
            device_class("Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)"),
            "tablet"
        );
        assert_eq!(device_class("Mozilla/5.0 (Linux; Android 14; SM-X910)"), "tablet");
        assert_eq!(device_class("TriplexSim/0.1"), "desktop");
    }

    #[test]
    fn test_strategy_falls_back_to_engine() {
        let report = CapabilityReport::detect(&FixedEnv {
            native: false,
            engine: true,
        });
        assert_eq!(report.strategy, PlaybackStrategy::Engine);
    }

    #[test]
    fn test_strategy_limited_when_nothing_available() {
        let report = CapabilityReport::detect(&FixedEnv {
            native: false,
            engine: false,
        });
        assert_eq!(report.strategy, PlaybackStrategy::LimitedSupport);
        assert_eq!(
            report.strategy.description(),
            "Limited video support - consider fallback options"
        );
    }
}
