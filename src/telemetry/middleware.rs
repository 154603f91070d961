use super::metrics::MetricsRegistry;
use super::{Direction, RequestMetrics};
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{HeaderValue, Request, Response},
    middleware::Next,
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Times every routed request, tags it with an `x-request-id` (kept from the
/// client when present) and records an inbound [`RequestMetrics`].
pub async fn metrics_middleware(
    State(registry): State<Arc<MetricsRegistry>>,
    mut req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let start = Instant::now();

    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    // Route templates keep ids out of the path label.
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().to_string();

    debug!("Received request: method={}, path={}, request_id={}", method, path, request_id);

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status().as_u16();
    let response_size = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    registry
        .record_metrics(RequestMetrics {
            direction: Direction::Inbound,
            method,
            path,
            latency: start.elapsed(),
            response_size,
            status_code: Some(status),
            error_type: None,
            request_id: Some(request_id),
        })
        .await;

    response
}
