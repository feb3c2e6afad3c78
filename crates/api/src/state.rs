// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the cat API server:
//! the configuration snapshot, the store handle, the injected logger and the
//! cancellation token of the owning server.

use std::sync::Arc;

use cat_store::CatStore;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{config::ServerConfig, logging::Logger};

/// Shared application state, cheap to clone into every handler
#[derive(Debug)]
pub struct ServerState<S> {
    /// Server configuration
    config: Arc<ServerConfig>,
    /// Store handle, owns the connection pool
    store: Arc<S>,
    /// Logging capability
    logger: Arc<dyn Logger>,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

// Derived Clone would require `S: Clone`
impl<S> Clone for ServerState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            logger: Arc::clone(&self.logger),
            cancellation_token: self.cancellation_token.clone(),
        }
    }
}

impl<S: CatStore> ServerState<S> {
    /// Create new server state
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Store handle shared by all handlers
    /// * `logger` - Logging capability
    /// * `cancellation_token` - Token for coordinated cancellation
    pub fn new(
        config: Arc<ServerConfig>,
        store: Arc<S>,
        logger: Arc<dyn Logger>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            store,
            logger,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Store handle
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Logging capability
    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Round-trip the store within the configured health-check timeout
    pub async fn health_check(&self) -> HealthCheck {
        let timeout = self.config.database.health_check_timeout_seconds.value();

        let status = match tokio::time::timeout(timeout, self.store.ping()).await {
            Ok(Ok(())) => HealthStatus::Up,
            Ok(Err(e)) => HealthStatus::Down {
                reason: e.to_string().into_boxed_str(),
            },
            Err(_) => HealthStatus::Down {
                reason: format!("store ping timed out after {}s", timeout.as_secs())
                    .into_boxed_str(),
            },
        };

        HealthCheck {
            status,
            version: Box::from(env!("CARGO_PKG_VERSION")),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Health status of the service
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum HealthStatus {
    /// Store answered the probe
    Up,

    /// Store probe failed or timed out
    Down {
        /// Human-readable explanation of why the service is down
        reason: Box<str>,
    },
}

impl HealthStatus {
    /// Whether the probe succeeded
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }
}

/// Health check status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Service status
    pub status: HealthStatus,
    /// Service version
    pub version: Box<str>,
    /// Timestamp
    pub timestamp: String,
}
