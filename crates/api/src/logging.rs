// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Logging capability
//!
//! Components that log receive a [`Logger`] through their constructor instead
//! of reaching for a process-wide default, so tests can substitute a
//! recording backend without touching call sites. [`TracingLogger`] is the
//! production backend and forwards to `tracing`, whose subscriber is set up
//! once by [`init_tracing`].

use std::fmt;

use tracing::Level;
use tracing_subscriber::{
    EnvFilter, fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError,
};

use crate::config::{LogFormat, LogLevel, LoggingConfig};

/// A structured key/value pair attached to a log record
pub type Field<'a> = (&'a str, &'a dyn fmt::Display);

/// Message of every access log record
pub const ACCESS_LOG_MESSAGE: &str = "request completed";

/// One access log record, written once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord<'a> {
    /// Request method
    pub method: &'a str,
    /// Request path
    pub path: &'a str,
    /// Response status code, or `aborted` if the request was cancelled
    pub status: &'a str,
    /// Time spent inside the wrapped service
    pub latency_ms: u64,
    /// Value of `x-request-id`, `-` when absent
    pub request_id: &'a str,
}

/// Leveled, structured logging capability
pub trait Logger: Send + Sync + fmt::Debug {
    /// Emit one record at `level`
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]);

    /// Emit a debug record
    fn debug(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::DEBUG, message, fields);
    }

    /// Emit an info record
    fn info(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::INFO, message, fields);
    }

    /// Emit a warning record
    fn warn(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::WARN, message, fields);
    }

    /// Emit an error record
    fn error(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::ERROR, message, fields);
    }

    /// Emit the access log record of a finished request
    ///
    /// Defaults to an info record carrying the record as fields.
    fn access(&self, record: &AccessRecord<'_>) {
        self.info(
            ACCESS_LOG_MESSAGE,
            &[
                ("method", &record.method),
                ("path", &record.path),
                ("status", &record.status),
                ("latency_ms", &record.latency_ms),
                ("request_id", &record.request_id),
            ],
        );
    }

    /// Emit a record for a failure the process cannot recover from
    ///
    /// Logged at error level. Stopping is left to the caller, which returns
    /// the error out of `main` so destructors still run.
    fn fatal(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::ERROR, message, fields);
    }
}

/// [`Logger`] backed by the global `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        let fields = DisplayFields(fields);
        match level {
            Level::ERROR => tracing::error!(target: "cat_api", %fields, "{message}"),
            Level::WARN => tracing::warn!(target: "cat_api", %fields, "{message}"),
            Level::INFO => tracing::info!(target: "cat_api", %fields, "{message}"),
            Level::DEBUG => tracing::debug!(target: "cat_api", %fields, "{message}"),
            Level::TRACE => tracing::trace!(target: "cat_api", %fields, "{message}"),
        }
    }

    // Named fields, so the json formatter keeps them as separate keys
    fn access(&self, record: &AccessRecord<'_>) {
        tracing::info!(
            target: "cat_api",
            method = record.method,
            path = record.path,
            status = record.status,
            latency_ms = record.latency_ms,
            request_id = record.request_id,
            "{ACCESS_LOG_MESSAGE}"
        );
    }
}

/// Renders fields as space separated `key=value` pairs
struct DisplayFields<'a>(&'a [Field<'a>]);

impl fmt::Display for DisplayFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Debug level adds
/// source file and line to every record.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let with_source = config.level == LogLevel::Debug;

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format {
        LogFormat::Json => registry
            .with(
                fmt_layer::layer()
                    .json()
                    .with_file(with_source)
                    .with_line_number(with_source),
            )
            .try_init(),
        LogFormat::Console => registry
            .with(
                fmt_layer::layer()
                    .with_file(with_source)
                    .with_line_number(with_source),
            )
            .try_init(),
    }
}
