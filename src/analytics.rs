//! Playback analytics
//!
//! Records streaming events for one playback screen and folds them into a
//! running [`AnalyticsSummary`]. Events are kept in memory and logged; the
//! demo binary dumps the summary as JSON at the end of a run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Streaming event, tagged by `event` when serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    VideoStarted {
        video_id: String,
        video_title: String,
        timestamp: DateTime<Utc>,
    },
    VideoPlayed {
        video_id: String,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },
    VideoPaused {
        video_id: String,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },
    VideoCompleted {
        video_id: String,
        total_duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    BufferingStarted {
        video_id: String,
        position_ms: u64,
        timestamp: DateTime<Utc>,
    },
    BufferingEnded {
        video_id: String,
        buffering_duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    QualityChanged {
        video_id: String,
        from_quality: String,
        to_quality: String,
        timestamp: DateTime<Utc>,
    },
    AdShown {
        video_id: String,
        ad_id: String,
        ad_position_ms: u64,
        timestamp: DateTime<Utc>,
    },
    DrmInitialized {
        video_id: String,
        drm_scheme: String,
        timestamp: DateTime<Utc>,
    },
    ErrorOccurred {
        video_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::VideoStarted { .. } => "video_started",
            AnalyticsEvent::VideoPlayed { .. } => "video_played",
            AnalyticsEvent::VideoPaused { .. } => "video_paused",
            AnalyticsEvent::VideoCompleted { .. } => "video_completed",
            AnalyticsEvent::BufferingStarted { .. } => "buffering_started",
            AnalyticsEvent::BufferingEnded { .. } => "buffering_ended",
            AnalyticsEvent::QualityChanged { .. } => "quality_changed",
            AnalyticsEvent::AdShown { .. } => "ad_shown",
            AnalyticsEvent::DrmInitialized { .. } => "drm_initialized",
            AnalyticsEvent::ErrorOccurred { .. } => "error_occurred",
        }
    }
}

/// Aggregates over every tracked event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub total_videos_watched: u32,
    /// Milliseconds between start and pause/completion
    pub total_play_time_ms: u64,
    pub total_buffering_events: u32,
    pub total_ads_shown: u32,
    pub total_drm_initializations: u32,
    pub total_errors: u32,
    pub average_buffering_time_ms: u64,
    pub most_watched_video: Option<String>,
}

#[derive(Debug, Default)]
pub struct AnalyticsTracker {
    events: Vec<AnalyticsEvent>,
    summary: AnalyticsSummary,
    /// title -> times started
    watch_counts: HashMap<String, u32>,
    /// video id -> start time
    play_started: HashMap<String, DateTime<Utc>>,
    total_buffering_ms: u64,
}

impl AnalyticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, event: AnalyticsEvent) {
        info!("📊 Analytics event: {} {:?}", event.name(), event);
        self.update_summary(&event);
        self.events.push(event);
    }

    fn update_summary(&mut self, event: &AnalyticsEvent) {
        match event {
            AnalyticsEvent::VideoStarted {
                video_id,
                video_title,
                timestamp,
            } => {
                *self.watch_counts.entry(video_title.clone()).or_insert(0) += 1;
                self.play_started.insert(video_id.clone(), *timestamp);
                self.summary.total_videos_watched += 1;
                self.summary.most_watched_video = self.most_watched();
            }
            AnalyticsEvent::VideoPaused {
                video_id,
                timestamp,
                ..
            } => {
                let played = self
                    .play_started
                    .get(video_id)
                    .map(|start| elapsed_ms(*start, *timestamp))
                    .unwrap_or(0);
                self.summary.total_play_time_ms += played;
            }
            AnalyticsEvent::VideoCompleted {
                video_id,
                total_duration_ms,
                timestamp,
            } => {
                let played = self
                    .play_started
                    .remove(video_id)
                    .map(|start| elapsed_ms(start, *timestamp))
                    .unwrap_or(*total_duration_ms);
                self.summary.total_play_time_ms += played;
            }
            AnalyticsEvent::BufferingStarted { .. } => {
                self.summary.total_buffering_events += 1;
            }
            AnalyticsEvent::BufferingEnded {
                buffering_duration_ms,
                ..
            } => {
                self.total_buffering_ms += buffering_duration_ms;
                if self.summary.total_buffering_events > 0 {
                    self.summary.average_buffering_time_ms =
                        self.total_buffering_ms / self.summary.total_buffering_events as u64;
                }
            }
            AnalyticsEvent::AdShown { .. } => self.summary.total_ads_shown += 1,
            AnalyticsEvent::DrmInitialized { .. } => self.summary.total_drm_initializations += 1,
            AnalyticsEvent::ErrorOccurred { .. } => self.summary.total_errors += 1,
            AnalyticsEvent::VideoPlayed { .. } | AnalyticsEvent::QualityChanged { .. } => {}
        }
    }

    fn most_watched(&self) -> Option<String> {
        self.watch_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(title, _)| title.clone())
    }

    pub fn summary(&self) -> &AnalyticsSummary {
        &self.summary
    }

    pub fn events(&self) -> &[AnalyticsEvent] {
        &self.events
    }

    /// The last `count` events, oldest first
    pub fn recent_events(&self, count: usize) -> &[AnalyticsEvent] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_milliseconds()).unwrap_or(0)
}
