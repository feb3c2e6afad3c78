// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command line flags
//!
//! Flags take precedence over every other configuration source. Only flags
//! that were actually passed are applied, so an omitted flag never masks a
//! value coming from a file or the environment.

use std::path::PathBuf;

use clap::Parser;
use config::{ConfigBuilder, ConfigError, builder::DefaultState};

use crate::config::{LogFormat, LogLevel};

/// cat api server
#[derive(Debug, Clone, Parser)]
#[command(name = "cat-api", version, about = "cat api server")]
pub struct Cli {
    /// Enable debug logging (same as `--logging.level debug`)
    #[arg(short = 'd', long)]
    pub debug_log: bool,

    /// Web server port
    #[arg(short = 'p', long = "web-port")]
    pub web_port: Option<u16>,

    /// Telemetry server port
    #[arg(long = "telemetry.port")]
    pub telemetry_port: Option<u16>,

    /// Do not start the telemetry server
    #[arg(long = "telemetry.disabled")]
    pub telemetry_disabled: bool,

    /// Expose the `/debug/pprof` endpoints on the telemetry server
    #[arg(long = "telemetry.profiling")]
    pub telemetry_profiling: bool,

    /// Minimum log level
    #[arg(long = "logging.level", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log output format
    #[arg(long = "logging.type", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Configuration file replacing `config.json`
    #[arg(long, env = "CAT_API_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Layer the passed flags over `builder`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be recorded.
    pub fn apply_overrides(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let level = if self.debug_log {
            Some(LogLevel::Debug)
        } else {
            self.log_level
        };

        let mut builder = builder
            .set_override_option("web_port", self.web_port.map(i64::from))?
            .set_override_option("telemetry.port", self.telemetry_port.map(i64::from))?
            .set_override_option("logging.level", level.map(LogLevel::as_str))?
            .set_override_option(
                "logging.type",
                self.log_format.map(|format| match format {
                    LogFormat::Json => "json",
                    LogFormat::Console => "console",
                }),
            )?;

        if self.telemetry_disabled {
            builder = builder.set_override("telemetry.enabled", false)?;
        }
        if self.telemetry_profiling {
            builder = builder.set_override("telemetry.profiling", true)?;
        }
        Ok(builder)
    }
}
