// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! Router construction for the two listeners. The web router serves the cat
//! resource; the telemetry router serves health, metrics and (optionally)
//! profiling endpoints.

pub mod handlers;
pub mod telemetry;

use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use cat_store::CatStore;
use handlers::{create_cat, get_cat, list_cats, method_not_allowed, not_found, update_cat};
use telemetry::healthz;
use tower::ServiceBuilder;

use crate::{
    metrics::{metrics_handler, track_metrics},
    middleware::{
        access_log, json_content_type_layer, propagate_request_id_layer, set_request_id_layer,
    },
    profiling,
    state::ServerState,
};

/// Router for the public web listener
///
/// Layers, outermost first: request id, JSON content type, access log,
/// metrics. Metrics sit on every route and the fallbacks so the matched route
/// template is available as a label.
pub fn web_router<S: CatStore>(state: ServerState<S>) -> Router {
    let logger = Arc::clone(state.logger());

    let middleware = ServiceBuilder::new()
        .layer(set_request_id_layer())
        .layer(propagate_request_id_layer())
        .layer(json_content_type_layer())
        .layer(from_fn_with_state(logger, access_log));

    Router::new()
        .route("/cats", get(list_cats::<S>))
        .route("/cat", post(create_cat::<S>))
        .route(
            "/cat/",
            get(get_cat::<S>).post(create_cat::<S>).put(update_cat::<S>),
        )
        .route("/cat/{*id}", get(get_cat::<S>).put(update_cat::<S>))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(from_fn(track_metrics))
        .layer(middleware)
        .with_state(state)
}

/// Router for the telemetry listener
pub fn telemetry_router<S: CatStore>(state: ServerState<S>) -> Router {
    let logger = Arc::clone(state.logger());

    let mut router = Router::new()
        .route("/healthz", get(healthz::<S>))
        .route("/metrics", get(metrics_handler));

    if state.config().telemetry.profiling {
        router = router.merge(profiling::routes());
    }

    let middleware = ServiceBuilder::new()
        .layer(set_request_id_layer())
        .layer(propagate_request_id_layer())
        .layer(from_fn_with_state(logger, access_log));

    router.layer(middleware).with_state(state)
}
