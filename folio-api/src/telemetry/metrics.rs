//! Prometheus Metrics Definitions
//!
//! All metrics register with the default Prometheus registry and are
//! served from `GET /metrics`.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance, registered on first use.
pub static METRICS: Lazy<ApiResult<FolioMetrics>> = Lazy::new(FolioMetrics::new);

/// Outcome label for `folio_pages_imported_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Success,
    Rejected,
    Failed,
}

impl ImportOutcome {
    fn as_label(self) -> &'static str {
        match self {
            ImportOutcome::Success => "success",
            ImportOutcome::Rejected => "rejected",
            ImportOutcome::Failed => "failed",
        }
    }
}

#[derive(Clone)]
pub struct FolioMetrics {
    /// labels: method, path, status
    pub http_requests_total: CounterVec,

    /// labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// labels: status
    pub pages_imported_total: CounterVec,
}

impl FolioMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "folio_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register http_requests_total: {}", e))
            })?,

            http_request_duration_seconds: register_histogram_vec!(
                "folio_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to register http_request_duration_seconds: {}",
                    e
                ))
            })?,

            pages_imported_total: register_counter_vec!(
                "folio_pages_imported_total",
                "Total .docx imports by outcome",
                &["status"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register pages_imported_total: {}", e))
            })?,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_import(&self, outcome: ImportOutcome) {
        self.pages_imported_total
            .with_label_values(&[outcome.as_label()])
            .inc();
    }
}

/// Record an import outcome, if metrics registered successfully.
pub fn record_import(outcome: ImportOutcome) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_import(outcome);
    }
}

/// Handler for GET /metrics, in Prometheus text format.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    // Register on first scrape so the families appear even before traffic.
    if let Err(e) = METRICS.as_ref() {
        tracing::error!(error = %e, "Metrics registration failed");
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    fn metrics() -> Result<&'static FolioMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        assert!(!metrics()?.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_import_counts_by_status() -> Result<(), String> {
        let metrics = metrics()?;
        let before = metrics
            .pages_imported_total
            .with_label_values(&["rejected"])
            .get();
        record_import(ImportOutcome::Rejected);
        let after = metrics
            .pages_imported_total
            .with_label_values(&["rejected"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_metrics_handler_exposes_families() -> Result<(), String> {
        metrics()?.record_http_request("GET", "/health/ping", 200, 0.001);

        let response = metrics_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("folio_http_requests_total"));
        Ok(())
    }
}
