//! Prometheus metrics registration and export.
//!
//! This module defines all Prometheus metrics used by tale-publish and
//! provides functions for initializing, registering, and exporting metrics.

use prometheus::{CounterVec, Encoder, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all tale-publish metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total publish runs, labeled by outcome (`success` or the failing step).
pub static PUBLISHES_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Publish run duration in seconds, labeled by outcome.
pub static PUBLISH_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Total object create calls, labeled by object kind and status.
pub static UPLOADS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Total bytes sent in successful create calls, labeled by object kind.
pub static UPLOADED_BYTES: OnceLock<CounterVec> = OnceLock::new();

/// Best-effort steps that fell back to an absent object, labeled by step.
pub static DEGRADED_STEPS: OnceLock<CounterVec> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// This function should be called once at application startup. Calling it
/// again leaves the first set of metrics in place.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails, typically due to
/// duplicate metric names or invalid metric configurations.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    // Publish metrics
    let publishes_total = CounterVec::new(
        Opts::new("tale_publish_publishes_total", "Total publish runs"),
        &["outcome"],
    )?;

    let publish_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "tale_publish_duration_seconds",
            "Publish run duration in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
        &["outcome"],
    )?;

    // Upload metrics
    let uploads_total = CounterVec::new(
        Opts::new("tale_publish_uploads_total", "Total object create calls"),
        &["kind", "status"],
    )?;

    let uploaded_bytes = CounterVec::new(
        Opts::new("tale_publish_uploaded_bytes_total", "Total bytes uploaded"),
        &["kind"],
    )?;

    let degraded_steps = CounterVec::new(
        Opts::new(
            "tale_publish_degraded_steps_total",
            "Best-effort steps that produced no object",
        ),
        &["step"],
    )?;

    registry.register(Box::new(publishes_total.clone()))?;
    registry.register(Box::new(publish_duration.clone()))?;
    registry.register(Box::new(uploads_total.clone()))?;
    registry.register(Box::new(uploaded_bytes.clone()))?;
    registry.register(Box::new(degraded_steps.clone()))?;

    // If any of these fail, metrics were already initialized (idempotent)
    let _ = REGISTRY.set(registry);
    let _ = PUBLISHES_TOTAL.set(publishes_total);
    let _ = PUBLISH_DURATION.set(publish_duration);
    let _ = UPLOADS_TOTAL.set(uploads_total);
    let _ = UPLOADED_BYTES.set(uploaded_bytes);
    let _ = DEGRADED_STEPS.set(degraded_steps);

    tracing::debug!("Prometheus metrics initialized");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
///
/// Returns a comment line instead when the registry has not been initialized
/// or encoding fails.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        let result = init_metrics();
        // First call should succeed or metrics already initialized
        assert!(result.is_ok() || REGISTRY.get().is_some());
    }

    #[test]
    fn test_metrics_after_init() {
        let _ = init_metrics();

        if let Some(uploads) = UPLOADS_TOTAL.get() {
            uploads.with_label_values(&["object", "success"]).inc();
        }

        let metrics = export_metrics();
        assert!(!metrics.starts_with("# Error"));
        assert!(metrics.contains("tale_publish_uploads_total"));
    }
}
