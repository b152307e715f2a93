use std::fmt::Write;
use tracing::info;

/// Base URL for Mux Big Buck Bunny test stream segments
const MUX_BASE: &str = "https://test-streams.mux.dev/x36xhzz/url_0";
/// Mux segment filename
const MUX_SEGMENT: &str = "193039199_mp4_h264_aac_hd_7.ts";
/// First Mux segment index
const MUX_START_INDEX: u32 = 462;
/// Duration of each segment in seconds
const SEGMENT_DURATION: f32 = 10.0;
/// Duration of each ad break in seconds
pub const BREAK_DURATION: u32 = 30;
/// Slate segments per ad break
const BREAK_SEGMENTS: u32 = BREAK_DURATION / SEGMENT_DURATION as u32;
/// Content segments after the last break
const TRAILING_SEGMENTS: u32 = 3;

/// Shape of the generated demo playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoPlaylist {
    /// Number of ad breaks (1-5, default: 3)
    pub breaks: u8,
    /// Seconds of content before each break (10, 15, 20; default: 20)
    pub interval_secs: u8,
}

impl Default for DemoPlaylist {
    fn default() -> Self {
        Self {
            breaks: 3,
            interval_secs: 20,
        }
    }
}

impl DemoPlaylist {
    /// Validated number of breaks, clamped to 1..=5
    pub fn num_breaks(&self) -> u8 {
        self.breaks.clamp(1, 5)
    }

    /// Validated interval in seconds, snapped to nearest allowed value
    pub fn interval(&self) -> u8 {
        match self.interval_secs {
            0..=12 => 10,
            13..=17 => 15,
            _ => 20,
        }
    }

    /// Content positions (ms) where the generated CUE-OUT tags land
    pub fn cue_out_positions_ms(&self) -> Vec<u64> {
        let segs_per_interval = segments_per_interval(self.interval());
        let cycle_ms = (segs_per_interval + BREAK_SEGMENTS) as u64 * SEGMENT_DURATION as u64 * 1000;
        let first_ms = segs_per_interval as u64 * SEGMENT_DURATION as u64 * 1000;

        (0..self.num_breaks() as u64)
            .map(|n| first_ms + n * cycle_ms)
            .collect()
    }

    /// Total playlist length in milliseconds
    pub fn duration_ms(&self) -> u64 {
        let segs_per_interval = segments_per_interval(self.interval());
        let segments =
            self.num_breaks() as u32 * (segs_per_interval + BREAK_SEGMENTS) + TRAILING_SEGMENTS;
        segments as u64 * SEGMENT_DURATION as u64 * 1000
    }

    /// Render the playlist: Mux Big Buck Bunny segments, with every break
    /// opened by `#EXT-X-CUE-OUT` at one of [`Self::cue_out_positions_ms`] and
    /// filled with slate that repeats the last content segment, so content
    /// resumes where it left off after the ads.
    pub fn build(&self) -> String {
        let cue_outs = self.cue_out_positions_ms();
        let segment_ms = SEGMENT_DURATION as u64 * 1000;
        let break_ms = BREAK_DURATION as u64 * 1000;

        let mut playlist = String::with_capacity(4096);
        let _ = writeln!(playlist, "#EXTM3U");
        let _ = writeln!(playlist, "#EXT-X-VERSION:3");
        let _ = writeln!(playlist, "#EXT-X-TARGETDURATION:{}", SEGMENT_DURATION as u32);
        let _ = writeln!(playlist, "#EXT-X-MEDIA-SEQUENCE:0");

        let mut next_content = MUX_START_INDEX;
        let mut open_break: Option<u64> = None;

        for position_ms in (0..self.duration_ms()).step_by(segment_ms as usize) {
            if let Some(start_ms) = open_break
                && position_ms >= start_ms + break_ms
            {
                let _ = writeln!(playlist, "#EXT-X-CUE-IN");
                open_break = None;
            }

            if cue_outs.contains(&position_ms) {
                info!("Demo HLS: ad break at {}ms", position_ms);
                let _ = writeln!(playlist, "#EXT-X-CUE-OUT:{}", BREAK_DURATION);
                open_break = Some(position_ms);
            }

            let segment = match open_break {
                Some(start_ms) => {
                    let elapsed_secs = (position_ms - start_ms) / 1000;
                    if elapsed_secs > 0 {
                        let _ = writeln!(
                            playlist,
                            "#EXT-X-CUE-OUT-CONT:{}/{}",
                            elapsed_secs, BREAK_DURATION
                        );
                    }
                    next_content.saturating_sub(1)
                }
                None => {
                    next_content += 1;
                    next_content - 1
                }
            };

            let _ = writeln!(playlist, "#EXTINF:{:.1},", SEGMENT_DURATION);
            let _ = writeln!(playlist, "{}", mux_segment_url(segment));
        }

        if open_break.is_some() {
            let _ = writeln!(playlist, "#EXT-X-CUE-IN");
        }
        let _ = writeln!(playlist, "#EXT-X-ENDLIST");

        playlist
    }
}

/// At least one content segment before every break
fn segments_per_interval(interval_secs: u8) -> u32 {
    ((interval_secs as f32 / SEGMENT_DURATION) as u32).max(1)
}

fn mux_segment_url(index: u32) -> String {
    format!("{}/url_{}/{}", MUX_BASE, index, MUX_SEGMENT)
}
