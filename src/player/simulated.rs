//! In-process media engine driven by an explicit clock.
//!
//! [`SimulatedSession`] stands in for a real player in the demo runner and in
//! tests. Nothing decodes: the engine only tracks which source is loaded,
//! where the playhead is and whether it should be moving. Time advances when
//! the caller says so, and the engine queues the [`ScreenEvent`]s a real
//! player would emit (item transitions, end of source, seek discontinuities
//! and timed stream metadata).
//!
//! The handle is cheap to clone; every clone drives the same engine.

use super::{MediaItem, MediaSession, MediaSource, PlaybackPosition, PlayerEvent, ScreenEvent};
use crate::scte35::TimedMetadata;
use std::sync::{Arc, Mutex, MutexGuard};

/// Control call received by the engine, recorded for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    SetSource(MediaSource),
    Prepare,
    Seek { index: usize, position_ms: u64 },
    SetPlayIntent(bool),
}

#[derive(Debug)]
struct Engine {
    source: Option<MediaSource>,
    prepared: bool,
    ended: bool,
    index: usize,
    position_ms: u64,
    play_intent: bool,
    /// Length of the content item; `None` plays forever
    content_duration_ms: Option<u64>,
    /// Length assumed for every ad item
    ad_duration_ms: u64,
    /// Content metadata, ascending by position
    timeline: Vec<TimedMetadata>,
    commands: Vec<SessionCommand>,
    events: Vec<ScreenEvent>,
}

impl Engine {
    fn item_count(&self) -> usize {
        match &self.source {
            Some(MediaSource::Ads(playlist)) => playlist.len(),
            Some(MediaSource::Content(_)) => 1,
            None => 0,
        }
    }

    fn seek_to(&mut self, index: usize, position_ms: u64) {
        let from = PlaybackPosition::new(self.index, self.position_ms);
        let to = PlaybackPosition::new(index, position_ms);

        self.index = index;
        self.position_ms = position_ms;
        self.ended = false;

        self.events
            .push(ScreenEvent::Player(PlayerEvent::SeekAttempt { from, to }));
        if from.index != to.index {
            self.events
                .push(ScreenEvent::Player(PlayerEvent::ItemTransition { index }));
        }
    }

    fn advance(&mut self, elapsed_ms: u64) {
        if !self.play_intent || !self.prepared || self.ended {
            return;
        }

        if matches!(self.source, Some(MediaSource::Ads(_))) {
            self.advance_ads(elapsed_ms);
        } else if self.source.is_some() {
            self.advance_content(elapsed_ms);
        }
    }

    fn advance_ads(&mut self, elapsed_ms: u64) {
        let count = self.item_count();
        self.position_ms += elapsed_ms;

        while self.position_ms >= self.ad_duration_ms {
            if self.index + 1 < count {
                self.position_ms -= self.ad_duration_ms;
                self.index += 1;
                self.events
                    .push(ScreenEvent::Player(PlayerEvent::ItemTransition {
                        index: self.index,
                    }));
            } else {
                self.position_ms = self.ad_duration_ms;
                self.ended = true;
                self.events
                    .push(ScreenEvent::Player(PlayerEvent::TerminalState));
                break;
            }
        }
    }

    fn advance_content(&mut self, elapsed_ms: u64) {
        let start = self.position_ms;
        let mut end = start + elapsed_ms;
        if let Some(duration) = self.content_duration_ms {
            end = end.min(duration);
        }

        let frames: Vec<ScreenEvent> = self
            .timeline
            .iter()
            .filter(|timed| timed.position_ms > start && timed.position_ms <= end)
            .map(|timed| ScreenEvent::Metadata(vec![timed.entry.clone()]))
            .collect();
        self.events.extend(frames);
        self.position_ms = end;

        if self.content_duration_ms.is_some_and(|d| end >= d) {
            self.ended = true;
            self.events
                .push(ScreenEvent::Player(PlayerEvent::TerminalState));
        }
    }
}

/// Shared handle to a simulated media engine
#[derive(Debug, Clone)]
pub struct SimulatedSession {
    inner: Arc<Mutex<Engine>>,
}

impl SimulatedSession {
    /// New engine with nothing loaded
    pub fn new(content_duration_ms: Option<u64>, ad_duration_ms: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Engine {
                source: None,
                prepared: false,
                ended: false,
                index: 0,
                position_ms: 0,
                play_intent: false,
                content_duration_ms,
                ad_duration_ms: ad_duration_ms.max(1),
                timeline: Vec::new(),
                commands: Vec::new(),
                events: Vec::new(),
            })),
        }
    }

    /// Attach timed stream metadata to the content item
    pub fn with_metadata(self, mut timeline: Vec<TimedMetadata>) -> Self {
        timeline.sort_by_key(|timed| timed.position_ms);
        self.engine().timeline = timeline;
        self
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        // Poisoning only follows a panic in another holder; the state stays usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Put content on the engine as the host app would before the screen
    /// takes over. Not recorded as a command.
    pub fn load_content(&self, item: MediaItem, position_ms: u64, play: bool) {
        let mut engine = self.engine();
        engine.source = Some(MediaSource::Content(item));
        engine.prepared = true;
        engine.ended = false;
        engine.index = 0;
        engine.position_ms = position_ms;
        engine.play_intent = play;
    }

    /// Move the clock forward and return every queued event
    pub fn advance(&self, elapsed_ms: u64) -> Vec<ScreenEvent> {
        let mut engine = self.engine();
        engine.advance(elapsed_ms);
        std::mem::take(&mut engine.events)
    }

    /// Scrub like a viewer would. The resulting events are queued.
    pub fn user_seek(&self, index: usize, position_ms: u64) {
        self.engine().seek_to(index, position_ms);
    }

    /// Drain queued player events, dropping queued metadata
    pub fn take_events(&self) -> Vec<PlayerEvent> {
        self.take_screen_events()
            .into_iter()
            .filter_map(|event| match event {
                ScreenEvent::Player(event) => Some(event),
                ScreenEvent::Metadata(_) => None,
            })
            .collect()
    }

    /// Drain every queued event
    pub fn take_screen_events(&self) -> Vec<ScreenEvent> {
        std::mem::take(&mut self.engine().events)
    }

    pub fn commands(&self) -> Vec<SessionCommand> {
        self.engine().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.engine().commands.clear();
    }

    pub fn source(&self) -> Option<MediaSource> {
        self.engine().source.clone()
    }

    pub fn is_prepared(&self) -> bool {
        self.engine().prepared
    }

    pub fn has_ended(&self) -> bool {
        self.engine().ended
    }
}

impl MediaSession for SimulatedSession {
    fn set_source(&mut self, source: MediaSource) {
        let mut engine = self.engine();
        engine.commands.push(SessionCommand::SetSource(source.clone()));
        engine.source = Some(source);
        engine.prepared = false;
        engine.ended = false;
        engine.index = 0;
        engine.position_ms = 0;
    }

    fn prepare(&mut self) {
        let mut engine = self.engine();
        engine.commands.push(SessionCommand::Prepare);
        engine.prepared = true;
    }

    fn seek(&mut self, index: usize, position_ms: u64) {
        let mut engine = self.engine();
        engine.commands.push(SessionCommand::Seek { index, position_ms });
        let index = index.min(engine.item_count().saturating_sub(1));
        engine.seek_to(index, position_ms);
    }

    fn set_play_intent(&mut self, play: bool) {
        let mut engine = self.engine();
        engine.commands.push(SessionCommand::SetPlayIntent(play));
        engine.play_intent = play;
    }

    fn current_position(&self) -> u64 {
        self.engine().position_ms
    }

    fn current_index(&self) -> usize {
        self.engine().index
    }

    fn play_intent(&self) -> bool {
        self.engine().play_intent
    }
}
