//! SCTE-35 stream metadata and ad-break marker detection
//!
//! The media engine surfaces decoded stream metadata as [`MetadataEntry`]
//! values. The [`detector`] reduces them to the two signals the ad playback
//! path cares about: "an ad break starts now" and "return to content".

pub mod detector;

pub use detector::{classify, detect};

/// SCTE-35 `splice_insert()` command as delivered by the media engine.
///
/// Time fields are in microseconds, matching the engine's clock. A field of
/// `None` means the stream left it unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceInsert {
    pub splice_event_id: u32,
    /// `true` when the splice leaves the network feed (going to ads)
    pub out_of_network: bool,
    pub program_splice_position_us: Option<u64>,
    pub break_duration_us: Option<u64>,
}

/// A single decoded metadata entry from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataEntry {
    /// SCTE-35 splice insert, the usual carrier for ad breaks
    SpliceInsert(SpliceInsert),
    /// SCTE-35 time signal; informational only
    TimeSignal { playback_position_us: Option<u64> },
    /// ID3 text information frame (some HLS packagers mark ads with `TXXX`)
    TextInformation {
        id: String,
        description: Option<String>,
        value: Option<String>,
    },
    /// Anything else the engine forwarded
    Unknown(String),
}

/// Metadata entry anchored to a content position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedMetadata {
    pub position_ms: u64,
    pub entry: MetadataEntry,
}

/// Ad-break signal extracted from stream metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSignal {
    /// Leave content for an ad break of `duration_ms`, signalled at `position_ms`
    BreakStart { duration_ms: u64, position_ms: u64 },
    /// Return to content
    BreakEnd,
}
