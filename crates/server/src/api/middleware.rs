//! Request metrics.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::metrics::{
    normalize_path, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};

/// Requests slower than this are logged. Downloads run inline and are
/// expected to be slow.
const SLOW_REQUEST: Duration = Duration::from_secs(5);

/// Records duration, count and in-flight gauge per normalized route.
/// Scrapes of `/metrics` itself are not recorded.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let raw_path = request.uri().path();
    if raw_path == "/metrics" {
        return next.run(request).await;
    }

    let route = normalize_path(raw_path);
    let method = request.method().clone();
    let started = Instant::now();

    HTTP_REQUESTS_IN_FLIGHT.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_IN_FLIGHT.dec();

    let elapsed = started.elapsed();
    let status = response.status();
    let labels = [method.as_str(), route.as_str(), status.as_str()];
    HTTP_REQUEST_DURATION
        .with_label_values(&labels)
        .observe(elapsed.as_secs_f64());
    HTTP_REQUESTS_TOTAL.with_label_values(&labels).inc();

    if elapsed >= SLOW_REQUEST {
        debug!(
            %method,
            route = %route,
            %status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Slow request"
        );
    }

    response
}
