use crate::error::{Result, WatchmeError};
use crate::scte35::{MetadataEntry, SpliceInsert, TimedMetadata};
use m3u8_rs::{ExtTag, MediaPlaylist, Playlist, parse_playlist_res};
use tracing::{debug, info};

const CUE_OUT: &str = "X-CUE-OUT";
const CUE_IN: &str = "X-CUE-IN";

/// Parse a media playlist from string content
pub fn parse_media_playlist(content: &str) -> Result<MediaPlaylist> {
    match parse_playlist_res(content.as_bytes()) {
        Ok(Playlist::MediaPlaylist(playlist)) => Ok(playlist),
        Ok(Playlist::MasterPlaylist(_)) => Err(WatchmeError::UnexpectedMasterPlaylist),
        Err(e) => Err(WatchmeError::PlaylistParseError(format!("{:?}", e))),
    }
}

/// Convert `#EXT-X-CUE-OUT` / `#EXT-X-CUE-IN` tags into timed splice inserts.
///
/// A tag takes effect at the start of the segment it precedes. Tags after the
/// last segment take effect at the end of the playlist. `CUE-OUT-CONT` only
/// repeats state and is skipped. A `CUE-OUT` whose duration cannot be read
/// still yields an out-of-network splice, without a break duration.
pub fn extract_cues(playlist: &MediaPlaylist) -> Vec<TimedMetadata> {
    let mut timeline = Vec::new();
    let mut next_event_id: u32 = 1;
    let mut open_event: Option<u32> = None;
    let mut position_us: u64 = 0;

    for segment in &playlist.segments {
        for tag in &segment.unknown_tags {
            push_cue(tag, position_us, &mut next_event_id, &mut open_event, &mut timeline);
        }
        let duration_us = seconds_to_us(segment.duration as f64).unwrap_or(0);
        position_us = position_us.saturating_add(duration_us);
    }

    for tag in &playlist.unknown_tags {
        push_cue(tag, position_us, &mut next_event_id, &mut open_event, &mut timeline);
    }

    info!("Found {} cue markers in playlist", timeline.len());
    timeline
}

/// Parse `content` and extract its cue timeline
pub fn cue_timeline(content: &str) -> Result<Vec<TimedMetadata>> {
    let playlist = parse_media_playlist(content)?;
    Ok(extract_cues(&playlist))
}

fn push_cue(
    tag: &ExtTag,
    position_us: u64,
    next_event_id: &mut u32,
    open_event: &mut Option<u32>,
    timeline: &mut Vec<TimedMetadata>,
) {
    let splice = match tag.tag.as_str() {
        CUE_OUT => {
            let event_id = *next_event_id;
            *next_event_id = next_event_id.wrapping_add(1);
            *open_event = Some(event_id);
            SpliceInsert {
                splice_event_id: event_id,
                out_of_network: true,
                program_splice_position_us: Some(position_us),
                break_duration_us: tag.rest.as_deref().and_then(parse_cue_out_duration),
            }
        }
        CUE_IN => SpliceInsert {
            splice_event_id: open_event.take().unwrap_or(0),
            out_of_network: false,
            program_splice_position_us: Some(position_us),
            break_duration_us: None,
        },
        _ => return,
    };

    debug!(
        "Cue {} at {}ms (event {})",
        tag.tag,
        position_us / 1000,
        splice.splice_event_id
    );
    timeline.push(TimedMetadata {
        position_ms: position_us / 1000,
        entry: MetadataEntry::SpliceInsert(splice),
    });
}

/// `30`, `30.000` or `DURATION=30`
fn parse_cue_out_duration(rest: &str) -> Option<u64> {
    let raw = rest
        .split(',')
        .map(str::trim)
        .find_map(|attr| match attr.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("DURATION") => Some(value),
            Some(_) => None,
            None => Some(attr),
        })?;

    seconds_to_us(raw.trim_matches('"').parse().ok()?)
}

fn seconds_to_us(seconds: f64) -> Option<u64> {
    if seconds.is_finite() && seconds >= 0.0 {
        Some((seconds * 1_000_000.0).round() as u64)
    } else {
        None
    }
}
