//! Stream reachability checks
//!
//! A lightweight HEAD request against a manifest URL, independent of any
//! playback slot. Used to separate "the stream is down" from "a slot cannot
//! play it" before burning time on a full comparison run.

use crate::error::{Error, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Checks manifest URLs for basic reachability
pub struct StreamProber {
    client: Client,
}

impl StreamProber {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Issue a HEAD request and report round-trip timing
    ///
    /// Non-2xx statuses and transport failures are both errors; callers that
    /// want a recordable outcome either way go through [`StreamProber::check`].
    #[instrument(skip(self))]
    pub async fn probe(&self, url: &str) -> Result<ProbeReport> {
        debug!("Probing stream: {}", url);
        let started = Instant::now();
        let response = self.client.head(url).send().await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ProbeStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        debug!(status = status.as_u16(), elapsed_ms, "probe succeeded");
        Ok(ProbeReport {
            url: url.to_string(),
            status: status.as_u16(),
            elapsed_ms,
        })
    }

    /// Probe and fold the result into a recordable outcome
    pub async fn check(&self, url: &str) -> ProbeOutcome {
        let started = Instant::now();
        match self.probe(url).await {
            Ok(report) => ProbeOutcome {
                url: report.url,
                success: true,
                elapsed_ms: report.elapsed_ms,
                detail: None,
            },
            Err(e) => ProbeOutcome {
                url: url.to_string(),
                success: false,
                elapsed_ms: started.elapsed().as_millis() as u64,
                detail: Some(e.to_string()),
            },
        }
    }
}

impl Default for StreamProber {
    fn default() -> Self {
        Self::new()
    }
}

/// A successful probe
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub url: String,
    pub status: u16,
    pub elapsed_ms: u64,
}

/// Success-or-failure view of one probe, suitable for the result log
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub url: String,
    pub success: bool,
    pub elapsed_ms: u64,
    /// Failure description, e.g. `HTTP 404: Not Found`
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_status_detail_format() {
        let err = Error::ProbeStatus {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }

    #[tokio::test]
    async fn test_unreachable_host_folds_into_outcome() {
        // Reserved TLD, resolution fails without touching the network
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let prober = StreamProber::with_client(client);
        let outcome = prober.check("https://stream.invalid/master.m3u8").await;
        assert!(!outcome.success);
        assert!(outcome.detail.is_some());
        assert_eq!(outcome.url, "https://stream.invalid/master.m3u8");
    }
}
