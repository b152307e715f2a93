//! Client-side ad insertion core.
//!
//! Detects SCTE-35 ad-break markers in stream metadata, falls back to
//! scheduled breaks when a stream has none, interrupts content on a media
//! session to play an ad playlist and restores it afterwards, and tracks
//! Linear Ad Replacement pods for overlay display.

pub mod ad;
pub mod analytics;
pub mod config;
pub mod error;
pub mod hls;
pub mod metrics;
pub mod player;
pub mod scte35;
pub mod session;
