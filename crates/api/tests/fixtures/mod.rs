// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Test fixtures for end-to-end server tests
//!
//! Starts a real [`Server`] on ephemeral ports over an in-memory store and a
//! logger that records every record it receives.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use api::{
    GroupExit, Logger, RunningServer, Server, ServerConfig, ShutdownConfig,
    logging::{ACCESS_LOG_MESSAGE, Field},
};
use cat_store::MemoryCatStore;
use tracing::Level;

/// One captured log record
#[derive(Debug, Clone)]
pub struct Record {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl Record {
    /// Value of `key`, if the record carries it
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Logger keeping every record in memory
#[derive(Debug, Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<Record>>,
}

impl RecordingLogger {
    /// All records captured so far
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().expect("logger lock").clone()
    }

    /// Access log records for `path`
    pub fn access_records(&self, path: &str) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.message == ACCESS_LOG_MESSAGE && r.field("path") == Some(path))
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        let fields = fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.to_string()))
            .collect();
        self.records.lock().expect("logger lock").push(Record {
            level,
            message: message.to_string(),
            fields,
        });
    }
}

/// A running server plus handles on its collaborators
#[derive(Debug)]
pub struct TestServer {
    pub web: String,
    pub telemetry: String,
    pub store: Arc<MemoryCatStore>,
    pub logger: Arc<RecordingLogger>,
    pub client: reqwest::Client,
    running: RunningServer,
}

impl TestServer {
    /// Start with the testing configuration
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::for_testing()).await
    }

    /// Start with `config`; ports should be 0
    pub async fn start_with(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryCatStore::new());
        let logger = Arc::new(RecordingLogger::default());
        let shutdown = ShutdownConfig {
            graceful_timeout: std::time::Duration::from_secs(1),
            ..ShutdownConfig::default()
        };

        let running = Server::new(config, shutdown, store.clone(), logger.clone())
            .without_signal_handling()
            .start()
            .await
            .expect("Failed to start test server");

        let telemetry = running
            .telemetry_addr
            .map(|addr| format!("http://{addr}"))
            .unwrap_or_default();

        Self {
            web: format!("http://{}", running.web_addr),
            telemetry,
            store,
            logger,
            client: reqwest::Client::new(),
            running,
        }
    }

    /// URL on the web listener
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.web)
    }

    /// URL on the telemetry listener
    pub fn telemetry_url(&self, path: &str) -> String {
        format!("{}{path}", self.telemetry)
    }

    /// Cancel the group and wait for it to finish
    pub async fn stop(self) -> GroupExit {
        self.running.shutdown();
        self.running.wait().await.expect("supervisor task")
    }
}
