//! Recording helpers for publish metrics.
//!
//! `MetricsCollector` wraps the raw Prometheus metrics with consistent
//! labels. Recording before `init_metrics()` is a no-op.

use super::prometheus::{
    DEGRADED_STEPS, PUBLISHES_TOTAL, PUBLISH_DURATION, UPLOADED_BYTES, UPLOADS_TOTAL,
};

#[derive(Debug, Clone, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Record a finished publish run. `outcome` is `success` or the name of
    /// the step that failed.
    pub fn record_publish(&self, outcome: &str, duration_secs: f64) {
        if let Some(publishes_total) = PUBLISHES_TOTAL.get() {
            publishes_total.with_label_values(&[outcome]).inc();
        }

        if let Some(publish_duration) = PUBLISH_DURATION.get() {
            publish_duration
                .with_label_values(&[outcome])
                .observe(duration_secs);
        }

        tracing::trace!(outcome, duration_secs, "Recorded publish metric");
    }

    /// Record one create call for an object of `kind`: `object`,
    /// `package_info`, `license`, `environment`, `descriptive_record` or
    /// `resource_map`.
    pub fn record_upload(&self, kind: &str, success: bool, bytes: u64) {
        let status = if success { "success" } else { "failure" };
        if let Some(uploads_total) = UPLOADS_TOTAL.get() {
            uploads_total.with_label_values(&[kind, status]).inc();
        }

        if success {
            if let Some(uploaded_bytes) = UPLOADED_BYTES.get() {
                uploaded_bytes
                    .with_label_values(&[kind])
                    .inc_by(bytes as f64);
            }
        }
    }

    /// Record a best-effort step that produced no object.
    pub fn record_degraded_step(&self, step: &str) {
        if let Some(degraded_steps) = DEGRADED_STEPS.get() {
            degraded_steps.with_label_values(&[step]).inc();
        }
    }
}
