// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! Configuration is assembled once at startup from layered sources and never
//! mutated afterwards. Later sources override earlier ones:
//!
//! 1. Default values
//! 2. Configuration file (`config.json`, or the file passed with `--config`)
//! 3. Environment-specific file (`config.{env}.json`)
//! 4. Environment variables with the `SERVER_` prefix (`__` separates nested
//!    keys, e.g. `SERVER_TELEMETRY__PORT`) and `DATABASE_URL`
//! 5. Command line flags

use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use cat_store::PgStoreConfig;
use clap::ValueEnum;
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    cli::Cli,
    error::{ServerError, ServerResult},
};

const DEFAULT_WEB_PORT: u16 = 8000;
const DEFAULT_TELEMETRY_PORT: u16 = 8001;

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Default port of the web listener
    pub const fn default_web() -> Self {
        Self {
            port: DEFAULT_WEB_PORT,
            environment: Environment::Development,
        }
    }

    /// Default port of the telemetry listener
    pub const fn default_telemetry() -> Self {
        Self {
            port: DEFAULT_TELEMETRY_PORT,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // validated during configuration loading once the environment is known
        Ok(Self {
            port,
            environment: Environment::Development,
        })
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Build from a value already known to be in range
    const fn from_secs_unchecked(seconds: u64) -> Self {
        Self(Duration::from_secs(seconds))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

/// Minimum severity of emitted log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, with source locations
    Debug,
    /// Informational and above
    Info,
    /// Warnings and errors
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format of log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human readable text
    Console,
}

/// Logging settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level
    pub level: LogLevel,
    /// Output format
    #[serde(rename = "type")]
    pub format: LogFormat,
}

/// Telemetry listener settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether the telemetry listener runs at all
    pub enabled: bool,
    /// Telemetry listener port
    pub port: ServerPort,
    /// Whether to expose the `/debug/pprof` endpoints
    pub profiling: bool,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout_seconds: TimeoutSeconds,
    /// Upper bound on the health check round-trip
    pub health_check_timeout_seconds: TimeoutSeconds,
    /// Disable prepared statement caching (for `PgBouncer` transaction pooling)
    pub disable_statement_cache: bool,
    /// Apply embedded migrations at startup
    pub run_migrations: bool,
}

impl DatabaseConfig {
    /// Connection settings for the PostgreSQL store
    pub fn store_config(&self) -> PgStoreConfig {
        PgStoreConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout_seconds.value(),
            disable_statement_cache: self.disable_statement_cache,
        }
    }
}

/// Server configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address both listeners bind to
    pub host: IpAddr,
    /// Web listener port (validated for environment compatibility)
    pub web_port: ServerPort,
    /// Telemetry listener settings
    pub telemetry: TelemetryConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Grace period given to listeners during shutdown
    pub shutdown_timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
}

impl ServerConfig {
    /// Create configuration from the process environment and parsed flags
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env(cli: &Cli) -> ServerResult<Self> {
        Self::load(cli, std::env::vars().collect()).map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration from `vars` (standing in for the process environment) and `cli`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load(cli: &Cli, vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let environment = vars
            .get("ENVIRONMENT")
            .map_or_else(|| "development".to_string(), |env| env.to_lowercase());

        let mut builder = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("web_port", i64::from(DEFAULT_WEB_PORT))?
            .set_default("telemetry.enabled", true)?
            .set_default("telemetry.port", i64::from(DEFAULT_TELEMETRY_PORT))?
            .set_default("telemetry.profiling", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.type", "console")?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_seconds", 5)?
            .set_default("database.health_check_timeout_seconds", 5)?
            .set_default("database.disable_statement_cache", true)?
            .set_default("database.run_migrations", true)?
            .set_default("shutdown_timeout_seconds", 3)?
            .set_default("environment", "development")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::with_name("config.json").required(false)),
        };

        builder = builder
            .add_source(File::with_name(&format!("config.{environment}.json")).required(false))
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("database.url", vars.get("DATABASE_URL").cloned())?;

        if vars.contains_key("ENVIRONMENT") {
            builder = builder.set_override("environment", environment)?;
        }

        builder = cli.apply_overrides(builder)?;

        let mut server_config: Self = builder.build()?.try_deserialize()?;
        server_config
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

        Ok(server_config)
    }

    /// Re-check ports against the final environment
    fn validate(&mut self) -> Result<()> {
        self.web_port = ServerPort::new(self.web_port.value(), self.environment)?;
        self.telemetry.port = ServerPort::new(self.telemetry.port.value(), self.environment)?;

        if self.telemetry.enabled && self.web_port.value() != 0 {
            ensure!(
                self.web_port.value() != self.telemetry.port.value(),
                "web and telemetry listeners cannot share port {}",
                self.web_port.value()
            );
        }
        Ok(())
    }

    /// Create configuration optimized for testing
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            web_port: ServerPort::testing(),
            telemetry: TelemetryConfig {
                enabled: true,
                port: ServerPort::testing(),
                profiling: true,
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                format: LogFormat::Console,
            },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/cats_test".to_string(),
                max_connections: 2,
                acquire_timeout_seconds: TimeoutSeconds::from_secs_unchecked(1),
                health_check_timeout_seconds: TimeoutSeconds::from_secs_unchecked(1),
                disable_statement_cache: true,
                run_migrations: false,
            },
            shutdown_timeout_seconds: TimeoutSeconds::from_secs_unchecked(1),
            environment: Environment::Testing,
        }
    }

    /// Socket address of the web listener
    pub fn web_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.web_port.value())
    }

    /// Socket address of the telemetry listener, if it is enabled
    pub fn telemetry_addr(&self) -> Option<SocketAddr> {
        self.telemetry
            .enabled
            .then(|| SocketAddr::new(self.host, self.telemetry.port.value()))
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}
