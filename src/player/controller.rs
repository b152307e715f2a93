//! Ad playback controller
//!
//! Interrupts content on a [`MediaSession`] to play an ad playlist and puts
//! the content back afterwards. The content position and play intent are
//! captured once when a fresh break starts; resuming a break mid-way reuses
//! that snapshot. While an ad plays, any seek the controller did not issue
//! itself is reverted.

use super::{MediaItem, MediaSession, MediaSource, PlaybackPosition, PlayerEvent};
use crate::ad::AdPlaylist;
use crate::metrics;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Invoked once when an ad break plays to its end
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Observable ad progress, published on every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdProgress {
    pub is_playing_ad: bool,
    pub current_ad_index: usize,
    pub total_ads: usize,
}

/// Controller state
///
/// While `is_playing_ad`, `current_ad_index < total_ads`. While idle both
/// counters are zero. The saved content fields hold the last snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdPlaybackState {
    pub is_playing_ad: bool,
    pub current_ad_index: usize,
    pub total_ads: usize,
    pub saved_content_position_ms: u64,
    pub saved_content_play_when_ready: bool,
}

impl AdPlaybackState {
    fn progress(&self) -> AdProgress {
        AdProgress {
            is_playing_ad: self.is_playing_ad,
            current_ad_index: self.current_ad_index,
            total_ads: self.total_ads,
        }
    }
}

struct Attachment<S> {
    session: S,
    content: MediaItem,
}

pub struct AdPlaybackController<S: MediaSession> {
    attachment: Option<Attachment<S>>,
    state: AdPlaybackState,
    on_complete: Option<CompletionCallback>,
    /// Target of the last seek issued by the controller, not yet reported back.
    /// Consumed by the next seek event, and dropped once playback reaches the
    /// target item so an engine that never reports its own seeks cannot leave
    /// it armed for a later user seek.
    pending_seek: Option<PlaybackPosition>,
    progress_tx: watch::Sender<AdProgress>,
}

impl<S: MediaSession> Default for AdPlaybackController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MediaSession> AdPlaybackController<S> {
    pub fn new() -> Self {
        let (progress_tx, _) = watch::channel(AdProgress::default());
        Self {
            attachment: None,
            state: AdPlaybackState::default(),
            on_complete: None,
            pending_seek: None,
            progress_tx,
        }
    }

    /// Bind a session and the content item to restore after each break.
    ///
    /// Replaces any previous attachment.
    pub fn attach(&mut self, session: S, content: MediaItem) {
        info!("Ad controller attached to content {}", content.uri);
        self.attachment = Some(Attachment { session, content });
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    pub fn state(&self) -> AdPlaybackState {
        self.state
    }

    pub fn is_playing_ad(&self) -> bool {
        self.state.is_playing_ad
    }

    pub fn progress(&self) -> AdProgress {
        self.state.progress()
    }

    /// Receiver that observes every progress change
    pub fn subscribe(&self) -> watch::Receiver<AdProgress> {
        self.progress_tx.subscribe()
    }

    /// Session handle, when attached
    pub fn session(&self) -> Option<&S> {
        self.attachment.as_ref().map(|a| &a.session)
    }

    /// Start a fresh ad break from the first ad
    pub fn play_ad_break<F>(&mut self, playlist: AdPlaylist, on_complete: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.begin_ad_break(playlist, 0, 0, on_complete);
    }

    /// Start an ad break, or resume one that is already playing.
    ///
    /// On a fresh break the content position and play intent are saved. When
    /// a break is already active the original snapshot is kept and the new
    /// `on_complete` replaces the pending one, which is dropped uncalled.
    /// `start_index` is clamped into the playlist.
    ///
    /// Without an attached session this only logs. An empty playlist invokes
    /// `on_complete` immediately and leaves the session untouched.
    pub fn begin_ad_break<F>(
        &mut self,
        playlist: AdPlaylist,
        start_index: usize,
        start_position_ms: u64,
        on_complete: F,
    ) where
        F: FnOnce() + Send + 'static,
    {
        let Some(attachment) = self.attachment.as_mut() else {
            warn!("Cannot start ad break: no media session attached");
            return;
        };

        if playlist.is_empty() {
            info!("Ad break has no ads, returning to content");
            on_complete();
            return;
        }

        let total_ads = playlist.len();
        let start_index = start_index.min(total_ads - 1);

        if self.state.is_playing_ad {
            info!(
                "⏯️ Resuming ad break at ad {}/{} ({}ms)",
                start_index + 1,
                total_ads,
                start_position_ms
            );
            if self.on_complete.take().is_some() {
                debug!("Pending ad break completion superseded by resume");
            }
        } else {
            self.state.saved_content_position_ms = attachment.session.current_position();
            self.state.saved_content_play_when_ready = attachment.session.play_intent();
            info!(
                "🎬 Starting ad break: {} ads, content saved at {}ms",
                total_ads, self.state.saved_content_position_ms
            );
        }

        // Total first so observers never see an index past the count
        self.state.total_ads = total_ads;
        self.state.current_ad_index = start_index;
        self.state.is_playing_ad = true;
        self.on_complete = Some(Box::new(on_complete));

        attachment.session.set_source(MediaSource::Ads(playlist));
        attachment.session.prepare();
        self.pending_seek = Some(PlaybackPosition::new(start_index, start_position_ms));
        attachment.session.seek(start_index, start_position_ms);
        attachment.session.set_play_intent(true);

        self.publish();
    }

    /// Feed one engine notification into the state machine
    pub fn handle_event(&mut self, event: &PlayerEvent) {
        match *event {
            PlayerEvent::ItemTransition { index } => self.on_item_transition(index),
            PlayerEvent::TerminalState => self.on_terminal_state(),
            PlayerEvent::SeekAttempt { from, to } => self.on_seek_attempt(from, to),
        }
    }

    fn on_item_transition(&mut self, index: usize) {
        if !self.state.is_playing_ad {
            return;
        }
        if self.pending_seek.is_some_and(|target| target.index == index) {
            debug!("Reached item {} before its seek was reported", index + 1);
            self.pending_seek = None;
        }
        if index >= self.state.total_ads {
            debug!(
                "Ignoring transition to item {} of {}",
                index, self.state.total_ads
            );
            return;
        }
        if index != self.state.current_ad_index {
            self.state.current_ad_index = index;
            info!("📺 Now playing ad {}/{}", index + 1, self.state.total_ads);
            self.publish();
        }
    }

    fn on_seek_attempt(&mut self, from: PlaybackPosition, to: PlaybackPosition) {
        if !self.state.is_playing_ad {
            return;
        }

        if let Some(expected) = self.pending_seek.take()
            && expected == to
        {
            debug!("Controller seek to ad {} settled", to.index + 1);
            return;
        }

        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };

        warn!(
            "🚫 Seek blocked during ad playback: ad {} @ {}ms -> ad {} @ {}ms",
            from.index + 1,
            from.position_ms,
            to.index + 1,
            to.position_ms
        );
        self.pending_seek = Some(from);
        attachment.session.seek(from.index, from.position_ms);
        metrics::record_seek_blocked();
    }

    fn on_terminal_state(&mut self) {
        if !self.state.is_playing_ad {
            debug!("Terminal state outside an ad break, ignoring");
            return;
        }
        info!("✅ Ad break finished, returning to content");
        self.restore_content(true);
    }

    /// Abort the active break and return to content without running the
    /// completion callback. No-op while idle.
    pub fn end_ad_break(&mut self) {
        if !self.state.is_playing_ad {
            return;
        }
        info!("Ending ad break early, returning to content");
        self.restore_content(false);
    }

    /// Detach the session and reset all state. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.attachment.take().is_some() {
            info!("Ad controller released");
        }
        self.on_complete = None;
        self.pending_seek = None;
        self.state = AdPlaybackState::default();
        self.publish();
    }

    fn restore_content(&mut self, complete: bool) {
        let callback = self.on_complete.take();

        self.state.is_playing_ad = false;
        self.state.current_ad_index = 0;
        self.state.total_ads = 0;
        self.pending_seek = None;

        if let Some(attachment) = self.attachment.as_mut() {
            attachment
                .session
                .set_source(MediaSource::Content(attachment.content.clone()));
            attachment.session.prepare();
            attachment
                .session
                .seek(0, self.state.saved_content_position_ms);
            attachment
                .session
                .set_play_intent(self.state.saved_content_play_when_ready);
        }

        self.publish();
        metrics::record_ad_break_finished(complete);

        if complete && let Some(callback) = callback {
            callback();
        }
    }

    fn publish(&self) {
        self.progress_tx.send_replace(self.state.progress());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{SessionCommand, SimulatedSession};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn playlist(n: usize) -> AdPlaylist {
        AdPlaylist::parse((0..n).map(|i| format!("https://ads.example.com/{}.mp4", i))).unwrap()
    }

    fn content() -> MediaItem {
        MediaItem::new("https://cdn.example.com/content.m3u8")
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn attached(position_ms: u64, playing: bool) -> (AdPlaybackController<SimulatedSession>, SimulatedSession) {
        let session = SimulatedSession::new(None, 15_000);
        session.load_content(content(), position_ms, playing);
        let mut controller = AdPlaybackController::new();
        controller.attach(session.clone(), content());
        (controller, session)
    }

    /// Deliver every queued engine event to the controller
    fn pump(controller: &mut AdPlaybackController<SimulatedSession>, session: &SimulatedSession) {
        loop {
            let events = session.take_events();
            if events.is_empty() {
                break;
            }
            for event in &events {
                controller.handle_event(event);
            }
        }
    }

    #[test]
    fn snapshot_and_restore_content() {
        let (mut controller, session) = attached(30_200, true);
        let (count, on_complete) = counter();

        controller.play_ad_break(playlist(2), on_complete);
        pump(&mut controller, &session);
        assert!(controller.is_playing_ad());
        assert_eq!(controller.state().saved_content_position_ms, 30_200);
        assert!(controller.state().saved_content_play_when_ready);

        controller.handle_event(&PlayerEvent::ItemTransition { index: 1 });
        assert_eq!(controller.progress().current_ad_index, 1);

        controller.handle_event(&PlayerEvent::TerminalState);
        assert!(!controller.is_playing_ad());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(session.source(), Some(MediaSource::Content(content())));
        assert_eq!(session.current_position(), 30_200);
        assert!(session.play_intent());
    }

    #[test]
    fn restores_paused_intent() {
        let (mut controller, session) = attached(12_000, false);
        controller.play_ad_break(playlist(1), || {});
        assert!(session.play_intent());

        controller.handle_event(&PlayerEvent::TerminalState);
        assert!(!session.play_intent());
        assert_eq!(session.current_position(), 12_000);
    }

    #[test]
    fn exhaustion_is_idempotent() {
        let (mut controller, _session) = attached(5_000, true);
        let (count, on_complete) = counter();

        controller.play_ad_break(playlist(2), on_complete);
        controller.handle_event(&PlayerEvent::TerminalState);
        controller.handle_event(&PlayerEvent::TerminalState);
        controller.handle_event(&PlayerEvent::TerminalState);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(controller.progress(), AdProgress::default());
    }

    #[test]
    fn resume_keeps_original_snapshot() {
        let (mut controller, session) = attached(30_200, true);
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();

        controller.play_ad_break(playlist(3), first_cb);
        session.advance(4_000);
        pump(&mut controller, &session);

        controller.begin_ad_break(playlist(3), 1, 2_000, second_cb);
        pump(&mut controller, &session);
        assert!(controller.is_playing_ad());
        assert_eq!(controller.progress().current_ad_index, 1);
        assert_eq!(controller.state().saved_content_position_ms, 30_200);

        controller.handle_event(&PlayerEvent::TerminalState);
        assert_eq!(session.current_position(), 30_200);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn start_index_is_clamped() {
        let (mut controller, session) = attached(0, true);
        controller.begin_ad_break(playlist(2), 7, 0, || {});

        let progress = controller.progress();
        assert_eq!(progress.current_ad_index, 1);
        assert_eq!(progress.total_ads, 2);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn user_seek_is_reverted() {
        let (mut controller, session) = attached(30_200, true);
        controller.play_ad_break(playlist(2), || {});
        pump(&mut controller, &session);

        session.advance(3_000);
        pump(&mut controller, &session);
        session.clear_commands();

        session.user_seek(1, 10_000);
        pump(&mut controller, &session);

        assert_eq!(session.commands(), vec![SessionCommand::Seek { index: 0, position_ms: 3_000 }]);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_position(), 3_000);
        assert!(controller.is_playing_ad());
    }

    #[test]
    fn duplicate_and_out_of_range_transitions_are_ignored() {
        let (mut controller, session) = attached(30_200, true);
        let mut rx = controller.subscribe();
        controller.play_ad_break(playlist(2), || {});
        pump(&mut controller, &session);
        let _ = rx.borrow_and_update();

        controller.handle_event(&PlayerEvent::ItemTransition { index: 1 });
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().current_ad_index, 1);

        controller.handle_event(&PlayerEvent::ItemTransition { index: 1 });
        controller.handle_event(&PlayerEvent::ItemTransition { index: 9 });
        assert!(!rx.has_changed().unwrap());
        assert_eq!(controller.progress().current_ad_index, 1);
        assert_eq!(controller.progress().total_ads, 2);
    }

    #[test]
    fn unreported_own_seek_does_not_shield_user_seek() {
        let (mut controller, session) = attached(30_200, true);
        controller.begin_ad_break(playlist(2), 1, 4_000, || {});

        // Engine reports the item change but never its seek
        let _ = session.take_events();
        controller.handle_event(&PlayerEvent::ItemTransition { index: 1 });
        session.clear_commands();

        controller.handle_event(&PlayerEvent::SeekAttempt {
            from: PlaybackPosition::new(1, 6_000),
            to: PlaybackPosition::new(1, 4_000),
        });

        assert_eq!(session.commands(), vec![SessionCommand::Seek { index: 1, position_ms: 6_000 }]);
    }

    #[test]
    fn own_seek_is_not_reverted() {
        let (mut controller, session) = attached(30_200, true);
        controller.begin_ad_break(playlist(2), 1, 4_000, || {});
        session.clear_commands();

        pump(&mut controller, &session);
        assert!(session.commands().is_empty());
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.current_position(), 4_000);
    }

    #[test]
    fn seeks_pass_through_outside_ads() {
        let (mut controller, session) = attached(30_200, true);
        session.user_seek(0, 60_000);
        pump(&mut controller, &session);

        assert!(session.commands().iter().all(|c| !matches!(c, SessionCommand::Seek { .. })));
        assert_eq!(session.current_position(), 60_000);
    }

    #[test]
    fn empty_playlist_completes_immediately() {
        let (mut controller, session) = attached(1_000, true);
        session.clear_commands();
        let (count, on_complete) = counter();

        controller.play_ad_break(AdPlaylist::empty(), on_complete);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!controller.is_playing_ad());
        assert!(session.commands().is_empty());
    }

    #[test]
    fn no_session_is_a_noop() {
        let mut controller: AdPlaybackController<SimulatedSession> = AdPlaybackController::new();
        let (count, on_complete) = counter();

        controller.play_ad_break(playlist(2), on_complete);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(controller.state(), AdPlaybackState::default());
    }

    #[test]
    fn end_ad_break_skips_callback() {
        let (mut controller, session) = attached(45_000, true);
        let (count, on_complete) = counter();

        controller.play_ad_break(playlist(2), on_complete);
        controller.end_ad_break();
        controller.end_ad_break();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!controller.is_playing_ad());
        assert_eq!(session.current_position(), 45_000);
        assert_eq!(session.source(), Some(MediaSource::Content(content())));
    }

    #[test]
    fn release_is_idempotent() {
        let (mut controller, _session) = attached(1_000, true);
        let (count, on_complete) = counter();
        controller.play_ad_break(playlist(2), on_complete);

        controller.release();
        controller.release();

        assert!(!controller.is_attached());
        assert_eq!(controller.state(), AdPlaybackState::default());
        controller.handle_event(&PlayerEvent::TerminalState);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn progress_is_observable() {
        let (mut controller, _session) = attached(1_000, true);
        let mut rx = controller.subscribe();

        controller.play_ad_break(playlist(3), || {});
        rx.changed().await.unwrap();
        assert_eq!(
            *rx.borrow_and_update(),
            AdProgress {
                is_playing_ad: true,
                current_ad_index: 0,
                total_ads: 3
            }
        );

        controller.handle_event(&PlayerEvent::ItemTransition { index: 2 });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().current_ad_index, 2);

        controller.handle_event(&PlayerEvent::TerminalState);
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_playing_ad);
    }
}
