//! Media session boundary and the ad playback controller
//!
//! The core never decodes media. It drives a [`MediaSession`] handle owned by
//! the caller: swapping sources, seeking and toggling play intent. The engine
//! reports back through [`PlayerEvent`]s, which the owner of the session
//! delivers to the controller on its single execution context.

pub mod controller;
pub mod simulated;

use crate::ad::AdPlaylist;
use crate::scte35::MetadataEntry;

pub use controller::{AdPlaybackController, AdPlaybackState, AdProgress};
pub use simulated::{SessionCommand, SimulatedSession};

/// A playable content item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub uri: String,
    pub title: Option<String>,
}

impl MediaItem {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// What the session is told to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Main content
    Content(MediaItem),
    /// Ads concatenated into one source, one item per ad
    Ads(AdPlaylist),
}

/// Item index within the current source plus offset into that item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackPosition {
    pub index: usize,
    pub position_ms: u64,
}

impl PlaybackPosition {
    pub fn new(index: usize, position_ms: u64) -> Self {
        Self { index, position_ms }
    }
}

/// Notifications from the media engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Playback moved to another item of the current source
    ItemTransition { index: usize },
    /// The current source played to its end
    TerminalState,
    /// A seek discontinuity, whoever issued it
    SeekAttempt {
        from: PlaybackPosition,
        to: PlaybackPosition,
    },
}

/// Everything a playback screen receives from its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    Player(PlayerEvent),
    /// One decoded metadata frame
    Metadata(Vec<MetadataEntry>),
}

/// Control surface of a media engine.
///
/// Implementations are handles: the controller keeps one while attached and
/// drops it on release, but tearing the engine down stays with the caller.
pub trait MediaSession {
    fn set_source(&mut self, source: MediaSource);
    fn prepare(&mut self);
    fn seek(&mut self, index: usize, position_ms: u64);
    fn set_play_intent(&mut self, play: bool);
    /// Position within the current item, in milliseconds
    fn current_position(&self) -> u64;
    fn current_index(&self) -> usize;
    fn play_intent(&self) -> bool;
}
