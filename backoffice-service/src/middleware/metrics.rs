//! Request counting for Prometheus.

use crate::services::metrics::{ERRORS_TOTAL, HTTP_REQUESTS_TOTAL};
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

/// Count every request by method, matched route and status class. The
/// matched route template keeps label cardinality bounded.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), path.as_str(), status.as_str()])
        .inc();
    if status.is_server_error() {
        ERRORS_TOTAL.with_label_values(&["http_server_error"]).inc();
    }

    response
}
