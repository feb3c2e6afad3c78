// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Middleware module for HTTP request processing
//!
//! This module provides the cross-cutting wrappers composed around the
//! routers: response content-type injection, access logging and request-id
//! propagation.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::logging::{AccessRecord, Logger};

/// Header carrying the per-request identifier
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that marks every response as JSON
///
/// Uses `if_not_present`, so a handler that set its own content type (the
/// Prometheus exposition, for instance) keeps it.
pub fn json_content_type_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(CONTENT_TYPE, HeaderValue::from_static("application/json"))
}

/// Layer assigning a UUID `x-request-id` to requests that arrive without one
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid)
}

/// Layer copying `x-request-id` from the request onto the response
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(REQUEST_ID_HEADER)
}

/// Access logging middleware
///
/// Emits exactly one record per request through the injected logger. The
/// record is written when the guard drops, so it also fires when the inner
/// future is cancelled mid-flight (status `aborted`).
pub async fn access_log(
    State(logger): State<Arc<dyn Logger>>,
    req: Request,
    next: Next,
) -> Response {
    let mut guard = AccessLogGuard::new(logger, &req);
    let response = next.run(req).await;
    guard.status = Some(response.status());
    response
}

/// Writes the access log record on drop
struct AccessLogGuard {
    logger: Arc<dyn Logger>,
    method: Method,
    path: String,
    request_id: Option<String>,
    started: Instant,
    status: Option<StatusCode>,
}

impl AccessLogGuard {
    fn new(logger: Arc<dyn Logger>, req: &Request) -> Self {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        Self {
            logger,
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            request_id,
            started: Instant::now(),
            status: None,
        }
    }
}

impl Drop for AccessLogGuard {
    fn drop(&mut self) {
        let status = self
            .status
            .map_or_else(|| "aborted".to_string(), |status| status.as_u16().to_string());
        let latency_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.logger.access(&AccessRecord {
            method: self.method.as_str(),
            path: &self.path,
            status: &status,
            latency_ms,
            request_id: self.request_id.as_deref().unwrap_or("-"),
        });
    }
}
