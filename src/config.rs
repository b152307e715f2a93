use crate::error::{Result, WatchmeError};
use std::env;

/// Default content stream (Big Buck Bunny HLS test stream)
pub const DEFAULT_CONTENT_URL: &str = "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8";

/// Ad provider selection
#[derive(Clone, Debug, PartialEq)]
pub enum AdProviderType {
    /// Two short sample creatives (default)
    Sample,
    /// Three long-form sample creatives
    Extended,
    /// Operator-supplied URI list from `AD_URLS`
    Static,
}

/// Where ad-break markers come from in the demo run
#[derive(Clone, Debug, PartialEq)]
pub enum MarkerSource {
    /// No stream markers: the fallback scheduler fires simulated breaks
    Simulated,
    /// CUE-OUT/CUE-IN tags from the demo HLS playlist feed the marker detector
    Playlist,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub is_dev: bool,
    /// Content item played by the demo screen
    pub content_url: String,
    /// Whether the content carries LAR ad pods
    pub content_has_ads: bool,
    /// Poll interval of the screen loop in milliseconds (default: 500)
    pub poll_interval_ms: u64,
    /// Scheduler trigger window in milliseconds (default: 750)
    pub trigger_window_ms: u64,
    /// Simulated break positions in milliseconds (default: 30s, 90s, 150s)
    pub ad_break_positions_ms: Vec<u64>,
    /// Ad provider type selection
    pub ad_provider_type: AdProviderType,
    /// Ad URIs (used when ad_provider_type = Static)
    pub ad_urls: Vec<String>,
    /// Marker source for the demo run
    pub marker_source: MarkerSource,
    /// Linear Ad Replacement polling on/off
    pub lar_enabled: bool,
    /// Length of the demo run in content seconds (default: 200)
    pub demo_duration_secs: u64,
    /// Simulated clock speed-up factor for the demo run (default: 20)
    pub demo_speed: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            is_dev: true,
            content_url: DEFAULT_CONTENT_URL.to_string(),
            content_has_ads: true,
            poll_interval_ms: 500,
            trigger_window_ms: 750,
            ad_break_positions_ms: vec![30_000, 90_000, 150_000],
            ad_provider_type: AdProviderType::Sample,
            ad_urls: Vec::new(),
            marker_source: MarkerSource::Simulated,
            lar_enabled: true,
            demo_duration_secs: 200,
            demo_speed: 20,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, CONTENT_URL is required.
    pub fn from_env() -> Result<Self> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Content URL: required in prod, defaults to the test stream in dev
        let content_url = if is_dev {
            env::var("CONTENT_URL").unwrap_or_else(|_| DEFAULT_CONTENT_URL.to_string())
        } else {
            env::var("CONTENT_URL").map_err(|_| {
                WatchmeError::Config("CONTENT_URL is required in production".to_string())
            })?
        };

        let content_has_ads = env::var("CONTENT_HAS_ADS")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let poll_interval_ms = parse_u64("POLL_INTERVAL_MS", 500)?;
        let trigger_window_ms = parse_u64("TRIGGER_WINDOW_MS", 750)?;

        if poll_interval_ms == 0 {
            return Err(WatchmeError::Config(
                "POLL_INTERVAL_MS must be greater than 0".to_string(),
            ));
        }

        // A window narrower than the poll interval lets a break slip between two polls
        if trigger_window_ms <= poll_interval_ms {
            return Err(WatchmeError::Config(format!(
                "TRIGGER_WINDOW_MS ({}) must be greater than POLL_INTERVAL_MS ({})",
                trigger_window_ms, poll_interval_ms
            )));
        }

        let ad_break_positions_ms = match env::var("AD_BREAK_POSITIONS") {
            Ok(raw) => parse_positions(&raw)?,
            Err(_) => vec![30_000, 90_000, 150_000],
        };

        let ad_urls: Vec<String> = env::var("AD_URLS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let ad_provider_type = match env::var("AD_PROVIDER_TYPE")
            .unwrap_or_else(|_| "auto".to_string())
            .to_lowercase()
            .as_str()
        {
            "static" => AdProviderType::Static,
            "extended" => AdProviderType::Extended,
            "sample" => AdProviderType::Sample,
            _ => {
                // Auto-detect: use the operator list if one is configured
                if ad_urls.is_empty() {
                    AdProviderType::Sample
                } else {
                    AdProviderType::Static
                }
            }
        };

        if ad_provider_type == AdProviderType::Static && ad_urls.is_empty() {
            return Err(WatchmeError::Config(
                "AD_URLS is required when AD_PROVIDER_TYPE=static".to_string(),
            ));
        }

        let marker_source = match env::var("MARKER_SOURCE")
            .unwrap_or_else(|_| "simulated".to_string())
            .to_lowercase()
            .as_str()
        {
            "playlist" | "hls" => MarkerSource::Playlist,
            _ => MarkerSource::Simulated,
        };

        let lar_enabled = env::var("LAR_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let demo_duration_secs = parse_u64("DEMO_DURATION_SECS", 200)?;
        let demo_speed = env::var("DEMO_SPEED")
            .unwrap_or_else(|_| "20".to_string())
            .parse::<u32>()
            .unwrap_or(20)
            .max(1);

        Ok(Config {
            is_dev,
            content_url,
            content_has_ads,
            poll_interval_ms,
            trigger_window_ms,
            ad_break_positions_ms,
            ad_provider_type,
            ad_urls,
            marker_source,
            lar_enabled,
            demo_duration_secs,
            demo_speed,
        })
    }
}

fn parse_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| WatchmeError::Config(format!("{} is not a valid integer: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated list of millisecond positions like "30000,90000"
fn parse_positions(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>().map_err(|e| {
                WatchmeError::Config(format!("Invalid AD_BREAK_POSITIONS entry '{}': {}", s, e))
            })
        })
        .collect()
}
