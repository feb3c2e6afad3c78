// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Cat API Server Implementation
//!
//! This crate provides the HTTP server for the cat CRUD service, built with
//! Axum: a web listener serving the cat resource and a telemetry listener
//! serving health, metrics and profiling, run together as one lifecycle group.
//!
//! # Module Structure
//!
//! - [`cli`]: Command-line flags layered over the configuration
//! - [`config`]: Server configuration and environment management with hierarchical loading
//! - [`error`]: Error types and HTTP response handling with proper status codes
//! - [`extractors`]: Path identifier and strict JSON body extractors
//! - [`lifecycle`]: First-exit-wins task group with bounded drain
//! - [`logging`]: Injected logging capability and `tracing` setup
//! - [`metrics`]: Prometheus metrics and request tracking middleware
//! - [`middleware`]: Access logging, content-type and request-id layers
//! - [`profiling`]: Runtime profiling endpoints
//! - [`routes`]: Router configuration and HTTP request handlers
//! - [`server`]: Listener binding and server lifecycle
//! - [`state`]: Shared application state and health checks
//!
//! # Key Features
//!
//! - **Strict Decoding**: Unknown fields and malformed identifiers are rejected before any store call
//! - **Graceful Shutdown**: The first member to exit cancels a shared `CancellationToken`; stragglers are aborted
//! - **Access Logging**: Exactly one record per request, including cancelled requests
//! - **Health Monitoring**: Store round-trip bounded by a timeout

pub mod cli;
pub mod config;
pub mod error;
pub mod extractors;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod profiling;
pub mod routes;
pub mod server;
pub mod state;

pub use cli::Cli;
pub use config::{Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use lifecycle::{ExitReason, GroupExit, LifecycleGroup, MemberExit, ShutdownConfig};
pub use logging::{AccessRecord, Logger, TracingLogger};
pub use server::{RunningServer, Server};
pub use shared_types::{Cat, CatChanges, CatId, NewCat, UpdateCat};
pub use state::{HealthCheck, HealthStatus, ServerState};
