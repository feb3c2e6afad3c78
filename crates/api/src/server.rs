// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct for the cat API: it binds the
//! web and telemetry listeners and runs them, together with the signal
//! watcher, as one [`LifecycleGroup`]. The store is closed exactly once after
//! the group has finished.

use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use cat_store::{CatStore, PgCatStore};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{DatabaseConfig, ServerConfig},
    error::{ServerError, ServerResult},
    lifecycle::{GroupExit, LifecycleGroup, MemberExit, ShutdownConfig, watch_signals},
    logging::Logger,
    routes::{telemetry_router, web_router},
    state::ServerState,
};

/// Main server struct
#[derive(Debug)]
pub struct Server<S> {
    /// Server configuration
    config: Arc<ServerConfig>,
    /// Server state shared with the handlers
    state: ServerState<S>,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    shutdown_config: ShutdownConfig,
    /// Whether the group watches OS signals
    watch_signals: bool,
}

/// Handle to a server whose listeners are bound and serving
#[derive(Debug)]
pub struct RunningServer {
    /// Bound address of the web listener
    pub web_addr: SocketAddr,
    /// Bound address of the telemetry listener, if enabled
    pub telemetry_addr: Option<SocketAddr>,
    token: CancellationToken,
    handle: JoinHandle<GroupExit>,
}

impl RunningServer {
    /// Cancel the group; members drain within the grace period
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Token shared by every lifecycle member
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the group to finish and the store to close
    ///
    /// # Errors
    ///
    /// Returns `ServerError::TaskJoin` if the supervising task panicked.
    pub async fn wait(self) -> ServerResult<GroupExit> {
        Ok(self.handle.await?)
    }
}

impl<S: CatStore> Server<S> {
    /// Create new server instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated server configuration
    /// * `shutdown_config` - Grace and force timeouts for the lifecycle group
    /// * `store` - Connected store; the server closes it on exit
    /// * `logger` - Logging capability handed to every component
    pub fn new(
        config: ServerConfig,
        shutdown_config: ShutdownConfig,
        store: Arc<S>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let config = Arc::new(config);
        let cancellation_token = CancellationToken::new();
        let state = ServerState::new(
            Arc::clone(&config),
            store,
            logger,
            cancellation_token.clone(),
        );

        Self {
            config,
            state,
            cancellation_token,
            shutdown_config,
            watch_signals: true,
        }
    }

    /// Do not install OS signal handlers
    ///
    /// For embedding and tests, where shutdown is driven through
    /// [`Server::shutdown`] or [`RunningServer::shutdown`].
    #[must_use]
    pub fn without_signal_handling(mut self) -> Self {
        self.watch_signals = false;
        self
    }

    /// Router served on the web listener
    pub fn web_router(&self) -> Router {
        web_router(self.state.clone())
    }

    /// Router served on the telemetry listener
    pub fn telemetry_router(&self) -> Router {
        telemetry_router(self.state.clone())
    }

    /// Bind the listeners and start the lifecycle group
    ///
    /// Both listeners are bound before anything is served, so a bind failure
    /// aborts startup without side effects.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if a listener cannot bind, or
    /// `ServerError::Startup` if its local address cannot be read.
    pub async fn start(self) -> ServerResult<RunningServer> {
        let (web_listener, web_addr) = bind(self.config.web_addr()).await?;
        let telemetry = match self.config.telemetry_addr() {
            Some(addr) => Some(bind(addr).await?),
            None => None,
        };
        let telemetry_addr = telemetry.as_ref().map(|(_, addr)| *addr);

        let logger = Arc::clone(self.state.logger());
        let port = web_addr.port();
        logger.info(
            "cat API server starting",
            &[
                ("address", &web_addr),
                ("port", &port),
                ("environment", &self.config.environment),
            ],
        );

        let mut group = LifecycleGroup::new(
            self.cancellation_token.clone(),
            self.shutdown_config,
            Arc::clone(&logger),
        );

        if self.watch_signals {
            group.add("signal", watch_signals);
        }

        let router = self.web_router();
        group.add("web", move |token| serve("web", web_listener, router, token));

        if let Some((listener, addr)) = telemetry {
            let router = self.telemetry_router();
            logger.info("telemetry listener starting", &[("address", &addr)]);
            group.add("telemetry", move |token| {
                serve("telemetry", listener, router, token)
            });
        }

        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            let exit = group.run().await;
            state.store().close().await;
            state.logger().info("store closed", &[]);
            exit
        });

        Ok(RunningServer {
            web_addr,
            telemetry_addr,
            token: self.cancellation_token,
            handle,
        })
    }

    /// Run the server until the lifecycle group finishes
    ///
    /// # Errors
    ///
    /// Returns startup errors from [`Server::start`], or `ServerError::TaskJoin`
    /// if the supervising task panicked.
    pub async fn run(self) -> ServerResult<GroupExit> {
        self.start().await?.wait().await
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    pub fn shutdown(&self) {
        self.state.logger().info("programmatic shutdown requested", &[]);
        self.cancellation_token.cancel();
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState<S> {
        &self.state
    }
}

/// Open the PostgreSQL store, applying migrations when configured
///
/// Failures are logged through [`Logger::fatal`]; nothing is serving yet, so
/// the caller is expected to stop.
///
/// # Errors
///
/// Returns `ServerError::Database` if the pool cannot connect or a migration
/// fails to apply.
pub async fn connect_store(
    config: &DatabaseConfig,
    logger: &dyn Logger,
) -> ServerResult<PgCatStore> {
    let store = PgCatStore::connect(&config.store_config())
        .await
        .map_err(|source| ServerError::Database { source })
        .inspect_err(|e| logger.fatal("failed to connect to database", &[("error", e)]))?;

    if config.run_migrations {
        store
            .migrate()
            .await
            .map_err(|source| ServerError::Database { source })
            .inspect_err(|e| logger.fatal("failed to run database migrations", &[("error", e)]))?;
        logger.info("database migrations applied", &[]);
    }

    Ok(store)
}

async fn bind(addr: SocketAddr) -> ServerResult<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            address: addr,
            source,
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::Startup { source })?;
    Ok((listener, local_addr))
}

/// Lifecycle member serving `router` until the token is cancelled
async fn serve(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    token: CancellationToken,
) -> ServerResult<MemberExit> {
    axum::serve(listener, router)
        .with_graceful_shutdown(token.cancelled_owned())
        .await
        .map_err(|source| ServerError::Serve {
            listener: name,
            source,
        })?;
    Ok(MemberExit::Stopped)
}
