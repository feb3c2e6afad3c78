// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Handlers served on the telemetry listener

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cat_store::CatStore;

use crate::state::{HealthStatus, ServerState};

/// `GET /healthz`
///
/// 200 when the store answers the probe in time, 500 otherwise. The body has
/// the same shape in both cases.
pub async fn healthz<S: CatStore>(State(state): State<ServerState<S>>) -> Response {
    let health = state.health_check().await;

    let status = match &health.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down { reason } => {
            state
                .logger()
                .warn("health check failed", &[("reason", reason)]);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(health)).into_response()
}
