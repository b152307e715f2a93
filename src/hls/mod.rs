//! HLS playlist support: cue tag extraction and the demo playlist

pub mod cue;
pub mod demo;

pub use cue::{cue_timeline, extract_cues, parse_media_playlist};
pub use demo::DemoPlaylist;
