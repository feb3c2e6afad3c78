// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! This module provides the error types for server operations and their
//! mapping onto HTTP responses. Request-time errors are fully handled at the
//! handler boundary; startup errors abort the process before any listener
//! serves traffic.

use std::net::SocketAddr;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cat_store::StoreError;
use shared_types::CatId;
use thiserror::Error;

const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Comprehensive error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// A listener stopped serving with an IO error
    #[error("{listener} listener failed: {source}")]
    Serve {
        /// Name of the listener
        listener: &'static str,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Store could not be prepared at startup
    #[error("Database setup failed: {source}")]
    Database {
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Store failure while handling a request
    #[error("Store operation {operation} failed: {source}")]
    Store {
        /// Name of the failed operation
        operation: &'static str,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Requested cat does not exist
    #[error("cat {cat_id} not found")]
    NotFound {
        /// Identifier that was looked up
        cat_id: CatId,
    },

    /// No route matches the request path
    #[error("no route for {path}")]
    RouteNotFound {
        /// Request path
        path: String,
    },

    /// Route exists but does not accept the request method
    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed {
        /// Request method
        method: String,
        /// Request path
        path: String,
    },

    /// Path segment after `/cat/` is not a valid identifier
    #[error("invalid cat id: '{segment}'")]
    InvalidId {
        /// Offending path segment
        segment: String,
    },

    /// JSON parsing errors with detailed context
    #[error("Invalid JSON request: {message}")]
    JsonError {
        /// Detailed error message
        message: String,
    },

    /// Task join errors for async operations
    #[error("Task join error: {source}")]
    TaskJoin {
        /// Underlying tokio join error
        #[source]
        source: tokio::task::JoinError,
    },

    /// Signal handling errors
    #[error("Signal handling error: {message}")]
    Signal {
        /// Error message
        message: String,
    },

    /// Runtime errors during server operation
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message
        message: String,
    },
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Map a store error from a request path onto the client-facing error
    pub fn from_store(operation: &'static str, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { cat_id } => Self::NotFound { cat_id },
            source => Self::Store { operation, source },
        }
    }

    /// HTTP status this error is rendered with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidId { .. } | ServerError::JsonError { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServerError::NotFound { .. } | ServerError::RouteNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ServerError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::Config { .. }
            | ServerError::Bind { .. }
            | ServerError::Startup { .. }
            | ServerError::Serve { .. }
            | ServerError::Database { .. }
            | ServerError::Store { .. }
            | ServerError::TaskJoin { .. }
            | ServerError::Signal { .. }
            | ServerError::Runtime { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // backend detail stays in the logs
        let message = if status.is_server_error() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

/// Convenient From implementations for common async error types
impl From<tokio::task::JoinError> for ServerError {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TaskJoin { source }
    }
}
