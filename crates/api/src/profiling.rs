// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Runtime profiling endpoints
//!
//! Mounted on the telemetry listener under `/debug/pprof/` when profiling is
//! enabled. The index lists the available profiles; `runtime` reports Tokio
//! scheduler statistics for the serving runtime.

use std::{sync::LazyLock, time::Instant};

use axum::{Json, Router, routing::get};
use serde::Serialize;

static STARTED_AT: LazyLock<Instant> = LazyLock::new(Instant::now);

const RUNTIME_PROFILE: &str = "/debug/pprof/runtime";

/// Entry in the profile index
#[derive(Debug, Serialize)]
pub struct ProfileEntry {
    /// Profile name
    pub name: &'static str,
    /// Path serving the profile
    pub path: &'static str,
    /// What the profile reports
    pub description: &'static str,
}

/// Snapshot of the Tokio runtime serving the request
#[derive(Debug, Serialize)]
pub struct RuntimeProfile {
    /// Process identifier
    pub pid: u32,
    /// Seconds since the profiling routes were mounted
    pub uptime_seconds: u64,
    /// Number of worker threads
    pub workers: usize,
    /// Tasks currently alive on the runtime
    pub alive_tasks: usize,
    /// Tasks waiting in the global injection queue
    pub global_queue_depth: usize,
}

/// Profiling routes, mergeable into a router of any state
pub fn routes<T>() -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    LazyLock::force(&STARTED_AT);
    Router::new()
        .route("/debug/pprof/", get(index))
        .route(RUNTIME_PROFILE, get(runtime))
}

/// `GET /debug/pprof/`
pub async fn index() -> Json<Vec<ProfileEntry>> {
    Json(vec![ProfileEntry {
        name: "runtime",
        path: RUNTIME_PROFILE,
        description: "tokio scheduler statistics",
    }])
}

/// `GET /debug/pprof/runtime`
pub async fn runtime() -> Json<RuntimeProfile> {
    let metrics = tokio::runtime::Handle::current().metrics();
    Json(RuntimeProfile {
        pid: std::process::id(),
        uptime_seconds: STARTED_AT.elapsed().as_secs(),
        workers: metrics.num_workers(),
        alive_tasks: metrics.num_alive_tasks(),
        global_queue_depth: metrics.global_queue_depth(),
    })
}
