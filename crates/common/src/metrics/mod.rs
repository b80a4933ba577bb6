//! Metrics and observability utilities
//!
//! Counters and histograms for one pipeline run, with standardized naming
//! conventions. A run is short-lived, so instead of serving a scrape
//! endpoint the recorder can be rendered to a Prometheus text file at the
//! end of the run.

use crate::errors::{AppError, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use std::time::Instant;

/// Metrics prefix for all ForumPulse metrics
pub const METRICS_PREFIX: &str = "forumpulse";

/// Buckets for forum API latency (in seconds)
pub const FETCH_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_posts_fetched_total", METRICS_PREFIX),
        Unit::Count,
        "Raw records returned by the forum API"
    );

    describe_counter!(
        format!("{}_posts_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Raw records rejected during normalization"
    );

    describe_counter!(
        format!("{}_posts_stored_total", METRICS_PREFIX),
        Unit::Count,
        "Posts written to the store, by outcome"
    );

    describe_counter!(
        format!("{}_store_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Posts that could not be written"
    );

    describe_counter!(
        format!("{}_fetch_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Community fetches that failed, by kind"
    );

    describe_histogram!(
        format!("{}_fetch_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Forum API request latency in seconds"
    );

    tracing::debug!("Metrics registered");
}

/// Install a Prometheus recorder for this process.
///
/// Fails if another recorder is already installed.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("fetch_duration_seconds".to_string()),
            FETCH_BUCKETS,
        )
        .and_then(|builder| builder.install_recorder())
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to install metrics recorder: {}", e),
        })
}

/// Render the recorder to `path` in the Prometheus text format
pub fn write_prometheus(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    std::fs::write(path, handle.render())?;
    Ok(())
}

/// Helper to time one community fetch
pub struct FetchTimer {
    start: Instant,
    community: String,
}

impl FetchTimer {
    /// Start timing a fetch
    pub fn start(community: &str) -> Self {
        Self {
            start: Instant::now(),
            community: community.to_string(),
        }
    }

    /// Record a successful fetch of `fetched` records
    pub fn success(self, fetched: usize) {
        histogram!(
            format!("{}_fetch_duration_seconds", METRICS_PREFIX),
            "community" => self.community.clone()
        )
        .record(self.start.elapsed().as_secs_f64());

        counter!(
            format!("{}_posts_fetched_total", METRICS_PREFIX),
            "community" => self.community
        )
        .increment(fetched as u64);
    }

    /// Record a failed fetch; `kind` is "not_found" or "unavailable"
    pub fn failure(self, kind: &str) {
        histogram!(
            format!("{}_fetch_duration_seconds", METRICS_PREFIX),
            "community" => self.community.clone()
        )
        .record(self.start.elapsed().as_secs_f64());

        counter!(
            format!("{}_fetch_failures_total", METRICS_PREFIX),
            "community" => self.community,
            "kind" => kind.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a rejected record
pub fn record_rejection(community: &str, reason: &str) {
    counter!(
        format!("{}_posts_rejected_total", METRICS_PREFIX),
        "community" => community.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Helper to record a store write; `outcome` is "inserted" or "updated"
pub fn record_stored(community: &str, outcome: &str) {
    counter!(
        format!("{}_posts_stored_total", METRICS_PREFIX),
        "community" => community.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record a failed store write
pub fn record_store_failure(community: &str) {
    counter!(
        format!("{}_store_failures_total", METRICS_PREFIX),
        "community" => community.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in FETCH_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_helpers_without_recorder() {
        // With no recorder installed every helper is a no-op.
        register_metrics();
        FetchTimer::start("rust").success(5);
        FetchTimer::start("nope").failure("not_found");
        record_rejection("rust", "empty_title");
        record_stored("rust", "inserted");
        record_store_failure("rust");
    }
}
