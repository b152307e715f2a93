//! Playback screen orchestrator
//!
//! One [`PlaybackScreen`] exists per active playback screen. It owns every
//! piece of per-screen state (the ad controller, the set of simulated break
//! positions already fired, the real-markers flag, the LAR registry and the
//! analytics tracker) and mutates it from a single task: engine events and
//! metadata frames arrive on an mpsc channel, poll ticks come from a tokio
//! interval, and [`PlaybackScreen::run`] interleaves the two.
//!
//! Ad lookups are the only await points. After each one the screen checks
//! that it has not been disposed before touching the controller.

use crate::ad::lar::LinearAdRegistry;
use crate::ad::provider::AdProvider;
use crate::ad::scheduler::AdBreakScheduler;
use crate::ad::{AdBreakRequest, BreakSource};
use crate::analytics::{AnalyticsEvent, AnalyticsTracker};
use crate::config::Config;
use crate::metrics;
use crate::player::{
    AdPlaybackController, AdProgress, MediaItem, MediaSession, MediaSource, PlayerEvent,
    ScreenEvent,
};
use crate::scte35::{MarkerSignal, detect};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Break length requested for simulated and manual breaks
pub const SIMULATED_BREAK_DURATION_MS: u64 = 30_000;

/// Content shown on a screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub uri: String,
    /// Whether LAR pods apply to this content
    pub has_ads: bool,
}

impl Video {
    fn media_item(&self) -> MediaItem {
        MediaItem::new(self.uri.clone()).with_title(self.title.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ScreenOptions {
    pub poll_interval: Duration,
    pub lar_enabled: bool,
    pub scheduler: AdBreakScheduler,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            lar_enabled: true,
            scheduler: AdBreakScheduler::default(),
        }
    }
}

impl ScreenOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            lar_enabled: config.lar_enabled,
            scheduler: AdBreakScheduler::new(
                config.ad_break_positions_ms.clone(),
                config.trigger_window_ms,
            ),
        }
    }
}

pub struct PlaybackScreen<S: MediaSession + Clone> {
    session: S,
    video: Option<Video>,
    controller: AdPlaybackController<S>,
    scheduler: AdBreakScheduler,
    triggered_positions: HashSet<u64>,
    real_markers_detected: bool,
    lar: LinearAdRegistry,
    analytics: AnalyticsTracker,
    provider: Arc<dyn AdProvider>,
    poll_interval: Duration,
    lar_enabled: bool,
    cancel: CancellationToken,
    disposed: bool,
}

impl<S: MediaSession + Clone> PlaybackScreen<S> {
    pub fn new(session: S, provider: Arc<dyn AdProvider>, options: ScreenOptions) -> Self {
        Self {
            session,
            video: None,
            controller: AdPlaybackController::new(),
            scheduler: options.scheduler,
            triggered_positions: HashSet::new(),
            real_markers_detected: false,
            lar: LinearAdRegistry::default(),
            analytics: AnalyticsTracker::new(),
            provider,
            poll_interval: options.poll_interval,
            lar_enabled: options.lar_enabled,
            cancel: CancellationToken::new(),
            disposed: false,
        }
    }

    /// Replace the LAR pod table
    pub fn with_lar_registry(mut self, lar: LinearAdRegistry) -> Self {
        self.lar = lar;
        self
    }

    /// Start playing `video` from the beginning.
    ///
    /// Any running break is dropped without restoring the old content, and
    /// all per-content ad state starts over.
    pub fn load_content(&mut self, video: Video) {
        if self.disposed {
            warn!("Cannot load {}: screen already disposed", video.id);
            return;
        }

        info!("🎬 Loading content {} ({})", video.title, video.uri);

        self.controller.release();
        self.triggered_positions.clear();
        self.real_markers_detected = false;
        self.lar.reset();

        let item = video.media_item();
        self.session.set_source(MediaSource::Content(item.clone()));
        self.session.prepare();
        self.session.set_play_intent(true);
        self.controller.attach(self.session.clone(), item);

        self.analytics.track(AnalyticsEvent::VideoStarted {
            video_id: video.id.clone(),
            video_title: video.title.clone(),
            timestamp: Utc::now(),
        });
        self.video = Some(video);
    }

    /// Apply one engine notification or metadata frame
    pub async fn handle_event(&mut self, event: ScreenEvent) {
        if !self.is_live() {
            return;
        }

        match event {
            ScreenEvent::Player(event) => self.handle_player_event(event),
            ScreenEvent::Metadata(entries) => {
                for signal in detect(&entries) {
                    self.handle_marker(signal).await;
                    if !self.is_live() {
                        return;
                    }
                }
            }
        }
    }

    fn handle_player_event(&mut self, event: PlayerEvent) {
        if event == PlayerEvent::TerminalState && !self.controller.is_playing_ad() {
            if let Some(video) = &self.video {
                info!("🏁 Content {} completed", video.id);
                self.analytics.track(AnalyticsEvent::VideoCompleted {
                    video_id: video.id.clone(),
                    total_duration_ms: self.session.current_position(),
                    timestamp: Utc::now(),
                });
            }
            return;
        }

        self.controller.handle_event(&event);
    }

    async fn handle_marker(&mut self, signal: MarkerSignal) {
        match signal {
            MarkerSignal::BreakStart {
                duration_ms,
                position_ms,
            } => {
                metrics::record_marker("break_start");
                self.real_markers_detected = true;

                if self.controller.is_playing_ad() {
                    debug!("Already in an ad break, ignoring repeated break start");
                    return;
                }

                self.start_break(AdBreakRequest {
                    duration_ms,
                    position_ms,
                    source: BreakSource::Signaled,
                })
                .await;
            }
            MarkerSignal::BreakEnd => {
                metrics::record_marker("break_end");
                self.controller.end_ad_break();
            }
        }
    }

    /// One poll tick: fire a simulated break when due, then update LAR
    pub async fn poll_once(&mut self) {
        if !self.is_live() || !self.controller.is_attached() {
            return;
        }

        let position = self.session.current_position();

        if let Some(break_position) = self.scheduler.decide(
            position,
            &self.triggered_positions,
            self.controller.is_playing_ad(),
            self.real_markers_detected,
        ) {
            warn!(
                "⚠️ No SCTE-35 markers detected in stream, simulating ad break at {}ms",
                break_position
            );
            // Recorded before the lookup so a tick arriving meanwhile cannot refire it
            self.triggered_positions.insert(break_position);

            self.start_break(AdBreakRequest {
                duration_ms: SIMULATED_BREAK_DURATION_MS,
                position_ms: break_position,
                source: BreakSource::Simulated,
            })
            .await;
            return;
        }

        if self.lar_enabled && !self.controller.is_playing_ad() {
            self.update_lar(position);
        }
    }

    fn update_lar(&mut self, position: u64) {
        let Some(video) = &self.video else {
            return;
        };

        if self.lar.is_ad_playing() {
            if self.lar.should_end(position) {
                self.lar.end_ad_pod();
            }
            return;
        }

        if let Some(pod) = self.lar.check_for_ad_break(position, video.has_ads).cloned() {
            let event = AnalyticsEvent::AdShown {
                video_id: video.id.clone(),
                ad_id: pod.id.clone(),
                ad_position_ms: position,
                timestamp: Utc::now(),
            };
            self.lar.start_ad_pod(pod);
            self.analytics.track(event);
            metrics::record_lar_pod_started();
        }
    }

    /// Play an ad break right now, as the "test ad" button does
    pub async fn request_manual_ad_break(&mut self) {
        if !self.is_live() || self.controller.is_playing_ad() {
            return;
        }

        info!("🧪 Manual ad break requested");
        let position = self.session.current_position();
        self.start_break(AdBreakRequest {
            duration_ms: SIMULATED_BREAK_DURATION_MS,
            position_ms: position,
            source: BreakSource::Manual,
        })
        .await;
    }

    async fn start_break(&mut self, request: AdBreakRequest) {
        metrics::record_ad_break_requested(request.source);

        let playlist = match self.provider.get_ad_playlist(&request).await {
            Ok(playlist) => playlist,
            Err(e) => {
                error!("Failed to get ads for {} break: {}", request.source.as_str(), e);
                metrics::record_provider_error();
                if let Some(video) = &self.video {
                    self.analytics.track(AnalyticsEvent::ErrorOccurred {
                        video_id: video.id.clone(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                return;
            }
        };

        if !self.is_live() {
            debug!("Screen disposed while fetching ads, dropping break");
            return;
        }

        metrics::record_ad_break_started(request.source, playlist.len());
        let source = request.source;
        self.controller.play_ad_break(playlist, move || {
            info!("✅ {} ad break complete, resumed content", source.as_str());
        });
    }

    /// Drive the screen until cancelled or the event channel closes, then
    /// dispose it.
    pub async fn run(&mut self, events: &mut mpsc::Receiver<ScreenEvent>) {
        let cancel = self.cancel.clone();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "🔍 Playback screen running, polling every {:?}",
            self.poll_interval
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Playback screen cancelled");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Player event channel closed");
                        break;
                    }
                },
                _ = ticker.tick() => self.poll_once().await,
            }
        }

        self.dispose();
    }

    /// Tear the screen down: stop the loop, close any LAR pod, record the
    /// pause and detach the controller. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.cancel.cancel();

        self.lar.end_ad_pod();
        self.lar.reset();

        if let Some(video) = &self.video
            && self.controller.is_attached()
        {
            let position = if self.controller.is_playing_ad() {
                self.controller.state().saved_content_position_ms
            } else {
                self.session.current_position()
            };
            self.analytics.track(AnalyticsEvent::VideoPaused {
                video_id: video.id.clone(),
                position_ms: position,
                timestamp: Utc::now(),
            });
        }

        self.controller.release();
        info!("Playback screen disposed");
    }

    fn is_live(&self) -> bool {
        !self.disposed && !self.cancel.is_cancelled()
    }

    /// Token that stops [`PlaybackScreen::run`] when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn controller(&self) -> &AdPlaybackController<S> {
        &self.controller
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<AdProgress> {
        self.controller.subscribe()
    }

    pub fn lar(&self) -> &LinearAdRegistry {
        &self.lar
    }

    pub fn analytics(&self) -> &AnalyticsTracker {
        &self.analytics
    }

    pub fn real_markers_detected(&self) -> bool {
        self.real_markers_detected
    }

    pub fn triggered_positions(&self) -> &HashSet<u64> {
        &self.triggered_positions
    }

    pub fn video(&self) -> Option<&Video> {
        self.video.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad::AdPlaylist;
    use crate::ad::provider::StaticAdProvider;
    use crate::error::Result;
    use crate::player::{SessionCommand, SimulatedSession};
    use crate::scte35::{MetadataEntry, SpliceInsert};
    use async_trait::async_trait;

    fn video() -> Video {
        Video {
            id: "bbb".to_string(),
            title: "Big Buck Bunny".to_string(),
            uri: "https://cdn.example.com/bbb.m3u8".to_string(),
            has_ads: true,
        }
    }

    fn screen() -> (PlaybackScreen<SimulatedSession>, SimulatedSession) {
        let session = SimulatedSession::new(None, 15_000);
        let mut screen = PlaybackScreen::new(
            session.clone(),
            Arc::new(StaticAdProvider::sample()),
            ScreenOptions::default(),
        );
        screen.load_content(video());
        (screen, session)
    }

    fn splice(out_of_network: bool, duration_us: Option<u64>) -> ScreenEvent {
        ScreenEvent::Metadata(vec![MetadataEntry::SpliceInsert(SpliceInsert {
            splice_event_id: 7,
            out_of_network,
            program_splice_position_us: Some(10_000_000),
            break_duration_us: duration_us,
        })])
    }

    /// Provider that cancels the screen while the lookup is in flight
    struct CancellingProvider {
        token: CancellationToken,
    }

    #[async_trait]
    impl AdProvider for CancellingProvider {
        async fn get_ad_playlist(&self, _request: &AdBreakRequest) -> Result<AdPlaylist> {
            self.token.cancel();
            AdPlaylist::parse(["https://ads.example.com/a.mp4"])
        }
    }

    #[tokio::test]
    async fn load_content_starts_playback() {
        let (screen, session) = screen();

        assert!(screen.controller().is_attached());
        assert!(session.play_intent());
        assert_eq!(screen.analytics().summary().total_videos_watched, 1);
    }

    #[tokio::test]
    async fn simulated_break_fires_once() {
        let (mut screen, session) = screen();
        session.advance(30_200);

        screen.poll_once().await;
        assert!(screen.controller().is_playing_ad());
        assert!(screen.triggered_positions().contains(&30_000));

        screen.handle_event(ScreenEvent::Player(PlayerEvent::TerminalState)).await;
        assert!(!screen.controller().is_playing_ad());
        assert_eq!(session.current_position(), 30_200);

        screen.poll_once().await;
        assert!(!screen.controller().is_playing_ad());
    }

    #[tokio::test]
    async fn signaled_break_disables_simulation() {
        let (mut screen, session) = screen();

        screen.handle_event(splice(true, Some(30_000_000))).await;
        assert!(screen.real_markers_detected());
        assert!(screen.controller().is_playing_ad());

        screen.handle_event(splice(false, None)).await;
        assert!(!screen.controller().is_playing_ad());

        session.advance(90_100);
        screen.poll_once().await;
        assert!(!screen.controller().is_playing_ad());
    }

    #[tokio::test]
    async fn break_start_during_break_does_not_restart_it() {
        let (mut screen, session) = screen();
        session.advance(30_200);
        screen.poll_once().await;
        assert!(screen.controller().is_playing_ad());
        assert!(!screen.real_markers_detected());

        screen.handle_event(splice(true, Some(30_000_000))).await;

        assert!(screen.real_markers_detected());
        assert!(screen.controller().is_playing_ad());
        assert_eq!(screen.controller().state().saved_content_position_ms, 30_200);
        let ad_sources = session
            .commands()
            .iter()
            .filter(|c| matches!(c, SessionCommand::SetSource(MediaSource::Ads(_))))
            .count();
        assert_eq!(ad_sources, 1);
    }

    #[tokio::test]
    async fn malformed_marker_is_ignored() {
        let (mut screen, _session) = screen();
        screen.handle_event(splice(true, None)).await;

        assert!(!screen.real_markers_detected());
        assert!(!screen.controller().is_playing_ad());
    }

    #[tokio::test]
    async fn lar_pod_starts_and_ends() {
        let (mut screen, session) = screen();
        session.user_seek(0, 121_000);
        session.take_events();

        screen.poll_once().await;
        assert_eq!(screen.lar().current_ad_pod().map(|p| p.id.as_str()), Some("pod1"));
        assert_eq!(screen.analytics().summary().total_ads_shown, 1);

        session.user_seek(0, 175_000);
        screen.poll_once().await;
        assert!(!screen.lar().is_ad_playing());
    }

    #[tokio::test]
    async fn content_completion_is_tracked() {
        let (mut screen, _session) = screen();
        screen.handle_event(ScreenEvent::Player(PlayerEvent::TerminalState)).await;

        assert!(
            screen
                .analytics()
                .events()
                .iter()
                .any(|e| e.name() == "video_completed")
        );
    }

    #[tokio::test]
    async fn dispose_during_lookup_drops_break() {
        let session = SimulatedSession::new(None, 15_000);
        let token = CancellationToken::new();
        let mut screen = PlaybackScreen::new(
            session.clone(),
            Arc::new(CancellingProvider { token: token.clone() }),
            ScreenOptions::default(),
        );
        screen.cancel = token;
        screen.load_content(video());
        session.advance(30_100);

        screen.poll_once().await;
        assert!(!screen.controller().is_playing_ad());
    }

    #[tokio::test]
    async fn dispose_is_idempotent() {
        let (mut screen, _session) = screen();
        screen.dispose();
        screen.dispose();

        assert!(screen.is_disposed());
        assert!(!screen.controller().is_attached());
        let paused = screen
            .analytics()
            .events()
            .iter()
            .filter(|e| e.name() == "video_paused")
            .count();
        assert_eq!(paused, 1);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (mut screen, _session) = screen();
        let (_tx, mut rx) = mpsc::channel(8);
        screen.cancellation_token().cancel();

        screen.run(&mut rx).await;
        assert!(screen.is_disposed());
    }

    #[tokio::test]
    async fn run_stops_when_channel_closes() {
        let (mut screen, _session) = screen();
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(ScreenEvent::Player(PlayerEvent::ItemTransition { index: 0 }))
            .await
            .unwrap();
        drop(tx);

        screen.run(&mut rx).await;
        assert!(screen.is_disposed());
    }
}
