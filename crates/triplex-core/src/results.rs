//! Persistent test-result log
//!
//! Outcomes from comparison runs, connectivity probes, and operator notes
//! accumulate in a JSON file, newest first, capped at [`MAX_RESULTS`].
//! Field names serialize in camelCase so exports stay interchangeable with
//! logs from the browser-based harness.

use crate::error::Result;
use crate::probe::ProbeOutcome;
use crate::types::PlayerTech;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Oldest entries fall off past this count
pub const MAX_RESULTS: usize = 50;

/// Default store file name
pub const DEFAULT_STORE_FILE: &str = "hls-test-results.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Error,
    Warning,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Success => write!(f, "success"),
            TestStatus::Error => write!(f, "error"),
            TestStatus::Warning => write!(f, "warning"),
        }
    }
}

/// One logged outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub stream_name: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub status: TestStatus,
    /// Serialized as `loadTime`, the key the browser harness logs use
    #[serde(rename = "loadTime")]
    pub load_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_type: Option<PlayerTech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl TestResult {
    /// Record a reachability probe
    pub fn connectivity(outcome: &ProbeOutcome) -> Self {
        Self {
            stream_name: "Stream Connectivity Test".to_string(),
            url: outcome.url.clone(),
            timestamp: Utc::now(),
            status: if outcome.success {
                TestStatus::Success
            } else {
                TestStatus::Error
            },
            load_time_ms: outcome.elapsed_ms,
            error_message: outcome.detail.clone(),
            player_type: None,
            quality: None,
        }
    }

    /// Record a free-form operator note
    pub fn note(text: &str, url: Option<&str>) -> Self {
        Self {
            stream_name: "Test Note".to_string(),
            url: url.unwrap_or("N/A").to_string(),
            timestamp: Utc::now(),
            status: TestStatus::Warning,
            load_time_ms: 0,
            error_message: Some(text.trim().to_string()),
            player_type: None,
            quality: None,
        }
    }
}

/// File-backed result log
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all stored results, newest first
    ///
    /// A missing file is an empty log. A corrupt file is logged and treated
    /// as empty rather than wedging every later command.
    pub fn load(&self) -> Result<Vec<TestResult>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(results) => Ok(results),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to load test results");
                Ok(Vec::new())
            }
        }
    }

    /// Prepend a result, dropping entries past the cap
    pub fn push(&self, result: TestResult) -> Result<()> {
        let mut results = self.load()?;
        results.insert(0, result);
        results.truncate(MAX_RESULTS);
        self.save(&results)
    }

    fn save(&self, results: &[TestResult]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string(results)?)?;
        debug!(count = results.len(), "saved test results");
        Ok(())
    }

    /// Delete the store file
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a pretty-printed, date-stamped copy into `dir`
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        let results = self.load()?;
        let name = format!("hls-test-results-{}.json", Utc::now().format("%Y-%m-%d"));
        let target = dir.join(name);
        std::fs::write(&target, serde_json::to_string_pretty(&results)?)?;
        Ok(target)
    }
}
