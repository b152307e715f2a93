//! Fallback ad-break scheduler.
//!
//! When a stream carries no SCTE-35 markers the demo still needs ad breaks,
//! so the playback screen polls [`AdBreakScheduler::decide`] on every tick.
//! The scheduler is stateless: the caller owns the set of positions already
//! fired and must record a returned trigger before the next poll.

use std::collections::HashSet;

/// Default simulated break positions: 30s, 90s and 150s into the content
pub const DEFAULT_BREAK_POSITIONS_MS: [u64; 3] = [30_000, 90_000, 150_000];

/// Default trigger window. Wider than the 500ms poll interval so a single
/// poll can never step over a break.
pub const DEFAULT_TRIGGER_WINDOW_MS: u64 = 750;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdBreakScheduler {
    /// Ascending, de-duplicated break positions
    break_positions_ms: Vec<u64>,
    trigger_window_ms: u64,
}

impl Default for AdBreakScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BREAK_POSITIONS_MS.to_vec(), DEFAULT_TRIGGER_WINDOW_MS)
    }
}

impl AdBreakScheduler {
    pub fn new(mut break_positions_ms: Vec<u64>, trigger_window_ms: u64) -> Self {
        break_positions_ms.sort_unstable();
        break_positions_ms.dedup();
        Self {
            break_positions_ms,
            trigger_window_ms,
        }
    }

    /// Decide whether a simulated break should fire at `current_position_ms`.
    ///
    /// Returns the configured break position to trigger, or `None` when real
    /// markers have been seen this session, an ad is already playing, or no
    /// untriggered break window contains the position.
    pub fn decide(
        &self,
        current_position_ms: u64,
        triggered_positions: &HashSet<u64>,
        is_playing_ad: bool,
        real_markers_detected: bool,
    ) -> Option<u64> {
        if real_markers_detected || is_playing_ad {
            return None;
        }

        self.break_positions_ms.iter().copied().find(|&position| {
            let in_window = current_position_ms >= position
                && current_position_ms < position.saturating_add(self.trigger_window_ms);
            in_window && !triggered_positions.contains(&position)
        })
    }

    pub fn scheduled_positions(&self) -> &[u64] {
        &self.break_positions_ms
    }

    /// First scheduled break strictly after `current_position_ms`
    pub fn next_break_after(&self, current_position_ms: u64) -> Option<u64> {
        self.break_positions_ms
            .iter()
            .copied()
            .find(|&position| position > current_position_ms)
    }

    pub fn trigger_window_ms(&self) -> u64 {
        self.trigger_window_ms
    }
}
