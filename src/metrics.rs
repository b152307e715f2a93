//! Prometheus-style counters for ad playback
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op, so library users and tests pay nothing.

use crate::ad::BreakSource;
use crate::error::{Result, WatchmeError};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder as the global metrics sink
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| WatchmeError::Metrics(e.to_string()))
}

/// An ad break was requested from the marker detector or the scheduler
pub fn record_ad_break_requested(source: BreakSource) {
    ::metrics::counter!("watchme_ad_breaks_requested_total", "source" => source.as_str())
        .increment(1);
}

/// An ad break left content; `ads` is the playlist length
pub fn record_ad_break_started(source: BreakSource, ads: usize) {
    ::metrics::counter!("watchme_ad_breaks_started_total", "source" => source.as_str())
        .increment(1);
    ::metrics::counter!("watchme_ads_scheduled_total").increment(ads as u64);
}

/// The controller returned to content
pub fn record_ad_break_finished(completed: bool) {
    let outcome = if completed { "completed" } else { "aborted" };
    ::metrics::counter!("watchme_ad_breaks_finished_total", "outcome" => outcome).increment(1);
}

pub fn record_seek_blocked() {
    ::metrics::counter!("watchme_seeks_blocked_total").increment(1);
}

/// A SCTE-35 signal reached the playback screen
pub fn record_marker(kind: &'static str) {
    ::metrics::counter!("watchme_markers_total", "kind" => kind).increment(1);
}

/// Ad lookup failed and the break was skipped
pub fn record_provider_error() {
    ::metrics::counter!("watchme_ad_provider_errors_total").increment(1);
}

pub fn record_lar_pod_started() {
    ::metrics::counter!("watchme_lar_pods_started_total").increment(1);
}
