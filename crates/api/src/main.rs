// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Cat API Server
//!
//! A minimal CRUD service for cat records backed by PostgreSQL.

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use api::{
    Cli, Logger, Server, ServerConfig, ShutdownConfig, TracingLogger, logging::init_tracing,
    server::connect_store,
};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = ServerConfig::from_env(&cli)?;

    init_tracing(&config.logging).context("failed to install tracing subscriber")?;
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger);

    logger.info(
        "starting cat API server",
        &[
            ("environment", &config.environment),
            ("web_addr", &config.web_addr()),
        ],
    );

    let store = connect_store(&config.database, logger.as_ref())
        .await
        .context("failed to open cat store")?;

    let shutdown_config = ShutdownConfig::from_config(&config);
    let server = Server::new(config, shutdown_config, Arc::new(store), Arc::clone(&logger));

    // NOTE: the `#[tokio::main]` task does not run a worker future, we must spawn
    let exit = tokio::spawn(server.run()).await??;

    let forced = exit.forced.join(",");
    let member = exit.member.unwrap_or("external");
    if exit.reason.is_failure() {
        logger.error(
            "cat API server stopped",
            &[("member", &member), ("reason", &exit.reason), ("forced", &forced)],
        );
        Ok(ExitCode::FAILURE)
    } else {
        logger.info(
            "cat API server stopped",
            &[("member", &member), ("reason", &exit.reason), ("forced", &forced)],
        );
        Ok(ExitCode::SUCCESS)
    }
}
