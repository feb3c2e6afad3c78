// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics module
//!
//! Provides global metrics using the default Prometheus registry via macros, a
//! request tracking middleware and an Axum-compatible metrics handler. With the
//! `process` feature the default registry also exports process CPU, memory and
//! file descriptor metrics on Linux.

use std::{sync::LazyLock, time::Instant};

use axum::{
    extract::{MatchedPath, Request},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, TextEncoder, register_histogram_vec,
    register_int_counter_vec,
};

use crate::error::ServerError;

/// Route label used for requests that matched no route
const UNMATCHED_ROUTE: &str = "unmatched";

/// Total number of HTTP requests, labeled by method, route and status.
pub static HTTP_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "cat_api_http_requests_total",
        "Total number of HTTP requests, labeled by method, route and status",
        &["method", "route", "status"]
    )
    .expect("Failed to create cat_api_http_requests_total counter vec")
});

/// Histogram for HTTP request durations in seconds.
pub static HTTP_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "cat_api_http_request_duration_seconds",
        "HTTP request durations in seconds",
        &["method", "route", "status"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create cat_api_http_request_duration_seconds histogram")
});

/// Store failures, labeled by operation.
pub static STORE_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "cat_api_store_errors_total",
        "Total number of failed store operations, labeled by operation",
        &["operation"]
    )
    .expect("Failed to create cat_api_store_errors_total counter vec")
});

/// Record a completed HTTP request
///
/// # Arguments
/// * `method` - HTTP method of the request
/// * `route` - Matched route template, or `unmatched`
/// * `status` - Response status
/// * `duration_secs` - Time spent in the handler chain in seconds
pub fn observe_http_request(method: &str, route: &str, status: StatusCode, duration_secs: f64) {
    let status = status.as_str();
    HTTP_REQUESTS
        .with_label_values(&[method, route, status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, route, status])
        .observe(duration_secs);
}

/// Record a failed store operation
pub fn inc_store_errors(operation: &str) {
    STORE_ERRORS.with_label_values(&[operation]).inc();
}

/// Middleware recording request count and latency per matched route
///
/// Labels use the route template (`/cat/{*id}`) rather than the raw path so
/// identifiers do not blow up label cardinality.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |path| path.as_str().to_string());
    let method = req.method().clone();

    let response = next.run(req).await;

    observe_http_request(
        method.as_str(),
        &route,
        response.status(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Axum handler that exports metrics in Prometheus text format
///
/// # Errors
///
/// Returns `ServerError::Runtime` if the metric families cannot be encoded.
pub async fn metrics_handler() -> Result<Response, ServerError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ServerError::Runtime {
            message: format!("failed to encode metrics: {e}"),
        })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}
