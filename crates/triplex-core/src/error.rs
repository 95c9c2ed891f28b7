//! Error types for Triplex Core

use crate::types::SlotKind;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Harness error types
#[derive(Error, Debug)]
pub enum Error {
    // Capability errors
    #[error("HLS playback not supported in slot {slot}")]
    Unsupported { slot: SlotKind },

    // Engine fault categories, as surfaced by adapters after recovery
    // attempts are exhausted
    #[error("Fatal network fault in slot {slot}: {details}")]
    NetworkFatal { slot: SlotKind, details: String },

    #[error("Fatal media fault in slot {slot}: {details}")]
    MediaFatal { slot: SlotKind, details: String },

    #[error("Unrecoverable engine fault in slot {slot}: {details}")]
    EngineFatal { slot: SlotKind, details: String },

    #[error("Media element error in slot {slot} (code {code}): {message}")]
    ElementError {
        slot: SlotKind,
        code: u8,
        message: String,
    },

    // Session errors
    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Slot {slot} is not configured in this session")]
    SlotNotConfigured { slot: SlotKind },

    #[error("Session is not ready: {0}")]
    SessionNotReady(String),

    // Probe errors
    #[error("HTTP {status}: {status_text}")]
    ProbeStatus { status: u16, status_text: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // Stream selection errors
    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    #[error("Invalid stream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Result store errors
    #[error("Result serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NetworkFatal { .. } | Error::MediaFatal { .. } | Error::Network(_)
        )
    }

    /// Returns the error code for diagnostics output
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unsupported { .. } => "UNSUPPORTED",
            Error::NetworkFatal { .. } => "NETWORK_FATAL",
            Error::MediaFatal { .. } => "MEDIA_FATAL",
            Error::EngineFatal { .. } => "ENGINE_FATAL",
            Error::ElementError { .. } => "ELEMENT_ERROR",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::SlotNotConfigured { .. } => "SLOT_NOT_CONFIGURED",
            Error::SessionNotReady(_) => "SESSION_NOT_READY",
            Error::ProbeStatus { .. } => "PROBE_STATUS",
            Error::Network(_) => "NETWORK",
            Error::UnknownStream(_) => "UNKNOWN_STREAM",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Io(_) => "IO",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_status_message() {
        let err = Error::ProbeStatus {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }

    #[test]
    fn test_recoverable_classification() {
        let network = Error::NetworkFatal {
            slot: SlotKind::Standard,
            details: "manifest timeout".to_string(),
        };
        assert!(network.is_recoverable());

        let unsupported = Error::Unsupported {
            slot: SlotKind::Native,
        };
        assert!(!unsupported.is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        let err = Error::EngineFatal {
            slot: SlotKind::Abr,
            details: "demux failure".to_string(),
        };
        assert_eq!(err.error_code(), "ENGINE_FATAL");
    }
}
