//! Observability infrastructure for the inference service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, volumes, failures, fallbacks)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, GaugeVec, Histogram, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Buckets for uploaded table sizes (rows)
const BATCH_ROW_BUCKETS: &[f64] = &[1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<InferenceMetricsInner> = OnceLock::new();

struct InferenceMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions: IntCounterVec,
    validation_failures: IntCounterVec,
    inference_errors: IntCounterVec,
    estimator_fallbacks: IntCounterVec,
    audit_write_errors: IntCounter,
    batch_rows: Histogram,
    model_info: GaugeVec,
}

impl InferenceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "hr_inference_prediction_latency_seconds",
                "End-to-end time spent serving a prediction request",
                &["endpoint"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions: register_int_counter_vec!(
                "hr_inference_predictions_total",
                "Total number of predictions served (one per row)",
                &["endpoint"]
            )
            .expect("Failed to register predictions_total"),

            validation_failures: register_int_counter_vec!(
                "hr_inference_validation_failures_total",
                "Requests rejected because of invalid input",
                &["endpoint"]
            )
            .expect("Failed to register validation_failures_total"),

            inference_errors: register_int_counter_vec!(
                "hr_inference_inference_errors_total",
                "Requests that failed during preprocessing or model invocation",
                &["endpoint"]
            )
            .expect("Failed to register inference_errors_total"),

            estimator_fallbacks: register_int_counter_vec!(
                "hr_inference_estimator_fallbacks_total",
                "Invocations retried against the terminal estimator with raw values",
                &["model"]
            )
            .expect("Failed to register estimator_fallbacks_total"),

            audit_write_errors: register_int_counter!(
                "hr_inference_audit_write_errors_total",
                "Audit entries that could not be written"
            )
            .expect("Failed to register audit_write_errors_total"),

            batch_rows: register_histogram!(
                "hr_inference_batch_rows",
                "Number of rows per uploaded table",
                BATCH_ROW_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_rows"),

            model_info: register_gauge_vec!(
                "hr_inference_model_info",
                "Information about the currently loaded models",
                &["model", "version", "probabilities"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Inference metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct InferenceMetrics {
    _private: (),
}

impl Default for InferenceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(InferenceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &InferenceMetricsInner {
        GLOBAL_METRICS.get_or_init(InferenceMetricsInner::new)
    }

    pub fn observe_latency(&self, endpoint: &str, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    pub fn inc_predictions(&self, endpoint: &str, rows: usize) {
        self.inner()
            .predictions
            .with_label_values(&[endpoint])
            .inc_by(rows as u64);
    }

    pub fn inc_validation_failures(&self, endpoint: &str) {
        self.inner()
            .validation_failures
            .with_label_values(&[endpoint])
            .inc();
    }

    pub fn inc_inference_errors(&self, endpoint: &str) {
        self.inner()
            .inference_errors
            .with_label_values(&[endpoint])
            .inc();
    }

    pub fn inc_estimator_fallbacks(&self, model: &str) {
        self.inner()
            .estimator_fallbacks
            .with_label_values(&[model])
            .inc();
    }

    pub fn inc_audit_write_errors(&self) {
        self.inner().audit_write_errors.inc();
    }

    pub fn observe_batch_rows(&self, rows: usize) {
        self.inner().batch_rows.observe(rows as f64);
    }

    /// Record which version of a model is loaded
    pub fn set_model_info(&self, model: &str, version: &str, probabilities: bool) {
        let probabilities = if probabilities { "true" } else { "false" };
        self.inner()
            .model_info
            .with_label_values(&[model, version, probabilities])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions,
/// rejections, and lifecycle events.
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

    /// Log service startup
    pub fn log_startup(&self, version: &str, models_loaded: usize) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            models_loaded = models_loaded,
            "Inference service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Inference service shutting down"
        );
    }

    /// Log a loaded model and the contract it was paired with
    pub fn log_model_loaded(
        &self,
        model: &str,
        version: &str,
        description: &str,
        features: &[String],
        probabilities: bool,
    ) {
        info!(
            event = "model_loaded",
            service = %self.service,
            model = %model,
            version = %version,
            description = %description,
            expected_features = features.len(),
            features = ?features,
            probabilities = probabilities,
            "Model loaded"
        );
    }

    /// Log a served prediction request
    pub fn log_prediction(&self, endpoint: &str, rows: usize, elapsed_ms: f64) {
        info!(
            event = "prediction_served",
            service = %self.service,
            endpoint = %endpoint,
            rows = rows,
            elapsed_ms = elapsed_ms,
            "Prediction served"
        );
    }

    /// Log a rejected request
    pub fn log_rejection(&self, endpoint: &str, reason: &str, client_error: bool) {
        if client_error {
            info!(
                event = "request_rejected",
                service = %self.service,
                endpoint = %endpoint,
                reason = %reason,
                "Request rejected"
            );
        } else {
            warn!(
                event = "request_failed",
                service = %self.service,
                endpoint = %endpoint,
                reason = %reason,
                "Request failed"
            );
        }
    }

    /// Log the outcome of the startup smoke prediction
    pub fn log_smoke_test(&self, success: bool, details: &str) {
        if success {
            info!(
                event = "smoke_test",
                service = %self.service,
                success = true,
                "Startup prediction test passed"
            );
        } else {
            warn!(
                event = "smoke_test",
                service = %self.service,
                success = false,
                details = %details,
                "Startup prediction test failed"
            );
        }
    }
}
