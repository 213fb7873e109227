//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (inference latency, predictions by label, errors by kind, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    inference_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    model_info: GaugeVec,
    schema_features: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram!(
                "heart_risk_inference_latency_seconds",
                "Time spent validating a record and running the classifier",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "heart_risk_predictions_total",
                "Predictions served, by predicted label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "heart_risk_prediction_errors_total",
                "Failed prediction requests, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_info: register_gauge_vec!(
                "heart_risk_model_info",
                "Information about the currently loaded classifier",
                &["version"]
            )
            .expect("Failed to register model_info"),

            schema_features: register_int_gauge!(
                "heart_risk_schema_features",
                "Number of features in the active schema"
            )
            .expect("Failed to register schema_features"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, label: u8) {
        let label = label.to_string();
        self.inner()
            .predictions_total
            .with_label_values(&[label.as_str()])
            .inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn set_model_version(&self, version: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[version])
            .set(1.0);
    }

    pub fn set_schema_features(&self, count: usize) {
        self.inner().schema_features.set(count as i64);
    }
}

/// Structured logger for service events
///
/// Patient inputs are never logged; prediction events carry only the outcome.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, schema_features: usize) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            schema_features = schema_features,
            "Heart risk service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Heart risk service shutting down"
        );
    }

    pub fn log_model_loaded(&self, path: &Path, model_version: &str, input_width: usize) {
        info!(
            event = "model_loaded",
            service = %self.service,
            path = ?path,
            model_version = %model_version,
            input_width = input_width,
            "Classifier ready"
        );
    }

    pub fn log_model_load_failed(&self, path: &Path, reason: &str) {
        warn!(
            event = "model_load_failed",
            service = %self.service,
            path = ?path,
            reason = %reason,
            "Classifier unavailable, predictions disabled"
        );
    }

    pub fn log_prediction(&self, label: u8, probability: f32, percentage: u8, model_version: &str) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            label = label,
            probability = probability,
            percentage = percentage,
            model_version = %model_version,
            "Generated heart disease prediction"
        );
    }

    pub fn log_prediction_failed(&self, kind: &str, reason: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            kind = %kind,
            reason = %reason,
            "Prediction request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.observe_inference_latency(0.001);
        metrics.inc_predictions(1);
        metrics.inc_predictions(0);
        metrics.inc_prediction_errors("schema_mismatch");
        metrics.set_model_version("v1.0.0");
        metrics.set_schema_features(13);

        let inner = metrics.inner();
        assert!(inner.predictions_total.with_label_values(&["1"]).get() >= 1);
        assert!(
            inner
                .prediction_errors_total
                .with_label_values(&["schema_mismatch"])
                .get()
                >= 1
        );
        assert_eq!(inner.schema_features.get(), 13);
    }

    #[test]
    fn test_metric_handles_share_state() {
        let a = ServiceMetrics::new();
        let b = a.clone();
        let before = a.inner().prediction_errors_total.with_label_values(&["inference_failure"]).get();
        b.inc_prediction_errors("inference_failure");
        let after = a.inner().prediction_errors_total.with_label_values(&["inference_failure"]).get();
        assert!(after > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("risk-server");
        assert_eq!(logger.service, "risk-server");
    }
}
