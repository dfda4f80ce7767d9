//! Request span, completion log and Prometheus recording for every request.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::metrics::METRICS;

/// Replace UUID and numeric path segments with `{id}` to keep metric
/// label cardinality bounded.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let is_id = Uuid::parse_str(segment).is_ok()
                || (!segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()));
            if is_id {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Observability middleware: one `http_request` span per request, a
/// completion log line, and HTTP metrics.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %normalized_path,
        user_id = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    span.in_scope(|| {
        if status.is_server_error() {
            tracing::error!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                duration_ms = duration.as_millis(),
                "Request failed"
            );
        } else {
            tracing::info!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                duration_ms = duration.as_millis(),
                "Request completed"
            );
        }
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/pages/550e8400-e29b-41d4-a716-446655440000/";
        assert_eq!(normalize_path(path), "/api/pages/{id}/");
    }

    #[test]
    fn test_normalize_path_numeric_id() {
        assert_eq!(normalize_path("/api/items/12345"), "/api/items/{id}");
    }

    #[test]
    fn test_normalize_path_mixed() {
        let path = "/api/universes/550e8400-e29b-41d4-a716-446655440000/worlds/123/";
        assert_eq!(normalize_path(path), "/api/universes/{id}/worlds/{id}/");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/universes/"), "/api/universes/");
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
    }
}
