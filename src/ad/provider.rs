use super::{AdBreakRequest, AdPlaylist};
use crate::config::{AdProviderType, Config};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Two short sample creatives (Google's public test videos)
pub const SAMPLE_AD_URLS: [&str; 2] = [
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerBlazes.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerEscapes.mp4",
];

/// Three long-form sample creatives
pub const EXTENDED_AD_URLS: [&str; 3] = [
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ElephantsDream.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerJoyrides.mp4",
];

/// Trait for ad content providers
///
/// Implementations return the ordered ad creatives that fill one break.
/// This abstraction allows for different ad decision strategies (static
/// lists today, an ad server later) without touching the playback path.
#[async_trait]
pub trait AdProvider: Send + Sync {
    /// Get the ad playlist for a break
    ///
    /// # Arguments
    /// * `request` - The break being filled (duration, position, source)
    ///
    /// # Returns
    /// An [`AdPlaylist`]; an empty playlist is a valid answer and makes the
    /// break a no-op.
    async fn get_ad_playlist(&self, request: &AdBreakRequest) -> Result<AdPlaylist>;
}

/// Static ad provider that returns a fixed list of creatives for every break
#[derive(Clone, Debug)]
pub struct StaticAdProvider {
    name: &'static str,
    ad_urls: Vec<String>,
}

impl StaticAdProvider {
    /// Create a provider over an operator-supplied URI list
    ///
    /// URIs are validated when a playlist is built, so a bad entry surfaces
    /// as an error on the break that would have used it.
    pub fn new(ad_urls: Vec<String>) -> Self {
        Self {
            name: "static",
            ad_urls,
        }
    }

    /// The two short sample creatives
    pub fn sample() -> Self {
        Self {
            name: "sample",
            ad_urls: SAMPLE_AD_URLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The three long-form sample creatives
    pub fn extended() -> Self {
        Self {
            name: "extended",
            ad_urls: EXTENDED_AD_URLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn ad_urls(&self) -> &[String] {
        &self.ad_urls
    }
}

#[async_trait]
impl AdProvider for StaticAdProvider {
    async fn get_ad_playlist(&self, request: &AdBreakRequest) -> Result<AdPlaylist> {
        info!(
            "StaticAdProvider({}): filling {} break of {}ms at {}ms with {} ads",
            self.name,
            request.source.as_str(),
            request.duration_ms,
            request.position_ms,
            self.ad_urls.len()
        );

        AdPlaylist::parse(&self.ad_urls)
    }
}

/// Build the provider selected by the configuration
pub fn provider_for(config: &Config) -> Arc<dyn AdProvider> {
    match config.ad_provider_type {
        AdProviderType::Sample => Arc::new(StaticAdProvider::sample()),
        AdProviderType::Extended => Arc::new(StaticAdProvider::extended()),
        AdProviderType::Static => Arc::new(StaticAdProvider::new(config.ad_urls.clone())),
    }
}
