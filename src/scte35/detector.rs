use super::{MarkerSignal, MetadataEntry, SpliceInsert};
use tracing::{debug, info};

/// Classify a single metadata entry.
///
/// Only splice inserts produce signals:
/// - out-of-network with a break duration → [`MarkerSignal::BreakStart`]
///   (an unset splice position defaults to 0)
/// - back-to-network → [`MarkerSignal::BreakEnd`], whatever the duration says
///
/// An out-of-network splice without a duration, time signals, ID3 ad markers
/// and unknown entries are logged and dropped.
pub fn classify(entry: &MetadataEntry) -> Option<MarkerSignal> {
    match entry {
        MetadataEntry::SpliceInsert(command) => classify_splice_insert(command),
        MetadataEntry::TimeSignal {
            playback_position_us,
        } => {
            match playback_position_us {
                Some(us) => info!("⏰ SCTE-35 time signal at {}ms", us / 1000),
                None => info!("⏰ SCTE-35 time signal without playback position"),
            }
            None
        }
        MetadataEntry::TextInformation {
            id,
            description,
            value,
        } => {
            if is_hls_ad_marker(id, description.as_deref()) {
                info!(
                    "📺 HLS ad marker: description={:?} value={:?}",
                    description, value
                );
            }
            None
        }
        MetadataEntry::Unknown(kind) => {
            debug!("Ignoring unrecognized metadata entry: {}", kind);
            None
        }
    }
}

/// Classify every entry of a metadata frame, preserving order.
pub fn detect(entries: &[MetadataEntry]) -> Vec<MarkerSignal> {
    entries.iter().filter_map(classify).collect()
}

fn classify_splice_insert(command: &SpliceInsert) -> Option<MarkerSignal> {
    info!(
        "🎬 SCTE-35 splice insert: event_id={} out_of_network={} position={:?}ms duration={:?}ms",
        command.splice_event_id,
        command.out_of_network,
        command.program_splice_position_us.map(|us| us / 1000),
        command.break_duration_us.map(|us| us / 1000),
    );

    if command.out_of_network {
        let Some(duration_us) = command.break_duration_us else {
            debug!(
                "Splice event {} goes out of network without a break duration, ignoring",
                command.splice_event_id
            );
            return None;
        };

        let duration_ms = duration_us / 1000;
        let position_ms = command
            .program_splice_position_us
            .map(|us| us / 1000)
            .unwrap_or(0);

        info!(
            "🎯 Ad break signalled: {}ms at position {}ms",
            duration_ms, position_ms
        );
        Some(MarkerSignal::BreakStart {
            duration_ms,
            position_ms,
        })
    } else {
        info!("✅ SCTE-35 return to content");
        Some(MarkerSignal::BreakEnd)
    }
}

/// `TXXX` frames whose description mentions "ad" (case-insensitive)
fn is_hls_ad_marker(id: &str, description: Option<&str>) -> bool {
    id == "TXXX"
        && description
            .map(|d| d.to_lowercase().contains("ad"))
            .unwrap_or(false)
}
