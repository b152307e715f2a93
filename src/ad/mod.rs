//! Ad break data model, ad sources, the fallback scheduler and the LAR registry

pub mod lar;
pub mod provider;
pub mod scheduler;

use crate::error::{Result, WatchmeError};
use url::Url;

/// Where an ad break request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakSource {
    /// SCTE-35 marker found in the stream
    Signaled,
    /// Fallback scheduler fired because the stream carries no markers
    Simulated,
    /// Viewer asked for an ad break ("test ad now")
    Manual,
}

impl BreakSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakSource::Signaled => "signaled",
            BreakSource::Simulated => "simulated",
            BreakSource::Manual => "manual",
        }
    }
}

/// Request to interrupt content for an ad break.
///
/// Produced by the marker detector or the scheduler; consumed once by the
/// ad playback controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdBreakRequest {
    pub duration_ms: u64,
    pub position_ms: u64,
    pub source: BreakSource,
}

/// Ordered ad URIs for one break. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdPlaylist {
    uris: Vec<Url>,
}

impl AdPlaylist {
    /// Build a playlist, validating every URI.
    ///
    /// # Errors
    ///
    /// Returns [`WatchmeError::InvalidAdUri`] for the first URI that fails to parse.
    pub fn parse<I, S>(uris: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let uris = uris
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                Url::parse(raw).map_err(|source| WatchmeError::InvalidAdUri {
                    uri: raw.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { uris })
    }

    /// An empty playlist; starting a break with it completes immediately.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    pub fn uris(&self) -> &[Url] {
        &self.uris
    }
}
