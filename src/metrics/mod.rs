//! Metrics module for Prometheus-based monitoring.
//!
//! Counts publish runs, object uploads and degraded best-effort steps.
//!
//! # Example
//!
//! ```ignore
//! use tale_publish::metrics::{init_metrics, export_metrics, MetricsCollector};
//!
//! init_metrics().expect("Failed to initialize metrics");
//! MetricsCollector::new().record_upload("object", true, 1024);
//! let metrics_text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::MetricsCollector;
pub use prometheus::{export_metrics, init_metrics};

pub use prometheus::{
    DEGRADED_STEPS, PUBLISHES_TOTAL, PUBLISH_DURATION, REGISTRY, UPLOADED_BYTES, UPLOADS_TOTAL,
};
