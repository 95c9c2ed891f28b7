//! Built-in test stream catalog
//!
//! A small set of well-known public HLS endpoints covering the interesting
//! axes: fMP4 vs TS containers, single vs multi-rendition ladders, and HDR
//! content. Category filters match on resolution substrings so a ladder
//! spanning 240p-1080p shows up under both low and high resolution.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// VOD or live edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamType {
    Vod,
    Live,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Vod => write!(f, "VOD"),
            StreamType::Live => write!(f, "LIVE"),
        }
    }
}

/// One selectable test stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Display name
    pub name: String,
    /// Master playlist URL
    pub url: String,
    /// What the stream exercises
    pub description: String,
    /// Resolution descriptor, free-form (category filters substring-match it)
    pub resolution: String,
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    /// Hosting provider
    pub source: String,
}

impl StreamConfig {
    /// Wrap a user-provided URL in catalog metadata
    pub fn custom(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;
        Ok(Self {
            name: "Custom Stream".to_string(),
            url: parsed.to_string(),
            description: "User provided stream URL".to_string(),
            resolution: "Unknown".to_string(),
            stream_type: StreamType::Vod,
            source: "Custom".to_string(),
        })
    }
}

/// The built-in catalog, in display order
pub fn test_streams() -> Vec<StreamConfig> {
    vec![
        StreamConfig {
            name: "Big Buck Bunny (fMP4)".to_string(),
            url: "https://devstreaming-cdn.apple.com/videos/streaming/examples/img_bipbop_adv_example_fmp4/master.m3u8".to_string(),
            description: "Apple official test stream with adaptive bitrate and captions".to_string(),
            resolution: "Multi-resolution (240p-1080p)".to_string(),
            stream_type: StreamType::Vod,
            source: "Apple".to_string(),
        },
        StreamConfig {
            name: "Dolby Vision/Atmos (4K HDR)".to_string(),
            url: "https://devstreaming-cdn.apple.com/videos/streaming/examples/adv_dv_atmos/main.m3u8".to_string(),
            description: "4K HDR content with Dolby Vision and Atmos".to_string(),
            resolution: "4K (3840x2160)".to_string(),
            stream_type: StreamType::Vod,
            source: "Apple".to_string(),
        },
        StreamConfig {
            name: "Wowza Test Stream".to_string(),
            url: "https://bitdash-a.akamaihd.net/content/sintel/hls/playlist.m3u8".to_string(),
            description: "Sintel test stream served by Bitdash".to_string(),
            resolution: "Multi-resolution".to_string(),
            stream_type: StreamType::Vod,
            source: "Bitdash".to_string(),
        },
        StreamConfig {
            name: "HLS.js Demo Stream".to_string(),
            url: "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8".to_string(),
            description: "Low-bandwidth test stream served by Mux".to_string(),
            resolution: "640x360".to_string(),
            stream_type: StreamType::Vod,
            source: "Mux".to_string(),
        },
        StreamConfig {
            name: "Cloudflare Stream".to_string(),
            url: "https://customer-f33zs165nr7gyfy4.cloudflarestream.com/6b9e68b07dfee8cc2d116e4c51d6a957/manifest/video.m3u8".to_string(),
            description: "High-quality adaptive test stream served by Cloudflare".to_string(),
            resolution: "Multi-resolution (adaptive)".to_string(),
            stream_type: StreamType::Vod,
            source: "Cloudflare".to_string(),
        },
    ]
}

/// Catalog filter facets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamCategory {
    All,
    Vod,
    Live,
    LowRes,
    HighRes,
    Mobile,
}

impl StreamCategory {
    /// Parse from CLI-style string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(StreamCategory::All),
            "vod" => Some(StreamCategory::Vod),
            "live" => Some(StreamCategory::Live),
            "low-res" | "low_res" => Some(StreamCategory::LowRes),
            "high-res" | "high_res" => Some(StreamCategory::HighRes),
            "mobile" => Some(StreamCategory::Mobile),
            _ => None,
        }
    }

    /// Display label for menus
    pub fn label(&self) -> &'static str {
        match self {
            StreamCategory::All => "All Streams",
            StreamCategory::Vod => "VOD",
            StreamCategory::Live => "LIVE",
            StreamCategory::LowRes => "Low Resolution",
            StreamCategory::HighRes => "High Resolution",
            StreamCategory::Mobile => "Mobile Optimized",
        }
    }

    /// Whether a stream belongs to this facet
    pub fn matches(&self, stream: &StreamConfig) -> bool {
        match self {
            StreamCategory::All => true,
            StreamCategory::Vod => stream.stream_type == StreamType::Vod,
            StreamCategory::Live => stream.stream_type == StreamType::Live,
            StreamCategory::LowRes => {
                stream.resolution.contains("240p") || stream.resolution.contains("360p")
            }
            StreamCategory::HighRes => {
                stream.resolution.contains("4K")
                    || stream.resolution.contains("UHD")
                    || stream.resolution.contains("1080p")
            }
            StreamCategory::Mobile => {
                stream.resolution.contains("240p")
                    || stream.resolution.contains("360p")
                    || stream.resolution.contains("480p")
            }
        }
    }
}

/// Catalog entries matching a facet, in display order
pub fn streams_in_category(category: StreamCategory) -> Vec<StreamConfig> {
    test_streams()
        .into_iter()
        .filter(|s| category.matches(s))
        .collect()
}

/// Resolve a user query to a stream
///
/// Accepts a catalog index (1-based), a case-insensitive name fragment, or a
/// full URL (which becomes a custom stream).
pub fn resolve(query: &str) -> Result<StreamConfig> {
    if query.starts_with("http://") || query.starts_with("https://") {
        return StreamConfig::custom(query);
    }

    let streams = test_streams();
    if let Ok(index) = query.parse::<usize>() {
        if index >= 1 && index <= streams.len() {
            return Ok(streams[index - 1].clone());
        }
        return Err(Error::UnknownStream(query.to_string()));
    }

    let needle = query.to_lowercase();
    streams
        .into_iter()
        .find(|s| s.name.to_lowercase().contains(&needle))
        .ok_or_else(|| Error::UnknownStream(query.to_string()))
}
