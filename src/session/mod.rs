//! Per-screen playback sessions

pub mod screen;

pub use screen::{PlaybackScreen, ScreenOptions, Video};
