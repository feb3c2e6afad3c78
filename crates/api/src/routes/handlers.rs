// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Handlers for the cat resource. Each one makes at most one store call;
//! malformed identifiers and bodies are rejected by the extractors before the
//! handler body runs.

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use cat_store::{CatStore, StoreError};
use serde::Serialize;
use shared_types::{CatChanges, NewCat, UpdateCat};

use crate::{
    error::ServerError,
    extractors::{CatIdPath, JsonExtractor},
    logging::Logger,
    metrics::inc_store_errors,
    state::ServerState,
};

/// `GET /cat/{id}`
pub async fn get_cat<S: CatStore>(
    State(state): State<ServerState<S>>,
    CatIdPath(cat_id): CatIdPath,
) -> Result<Response, ServerError> {
    let cat = state
        .store()
        .get_cat(cat_id)
        .await
        .map_err(|e| store_failure(state.logger().as_ref(), "get_cat", e))?;

    Ok(encode_json(state.logger().as_ref(), StatusCode::OK, &cat))
}

/// `POST /cat`
///
/// Answers 201 with an empty body; the assigned identifier is only logged.
pub async fn create_cat<S: CatStore>(
    State(state): State<ServerState<S>>,
    JsonExtractor(new_cat): JsonExtractor<NewCat>,
) -> Result<StatusCode, ServerError> {
    let cat = state
        .store()
        .add_cat(new_cat)
        .await
        .map_err(|e| store_failure(state.logger().as_ref(), "add_cat", e))?;

    state
        .logger()
        .debug("cat created", &[("cat_id", &cat.cat_id)]);
    Ok(StatusCode::CREATED)
}

/// `PUT /cat/{id}`
///
/// The identifier always comes from the path. An identifier that matches no
/// row still answers 200.
pub async fn update_cat<S: CatStore>(
    State(state): State<ServerState<S>>,
    CatIdPath(cat_id): CatIdPath,
    JsonExtractor(changes): JsonExtractor<CatChanges>,
) -> Result<StatusCode, ServerError> {
    state
        .store()
        .update_cat(UpdateCat::new(cat_id, changes))
        .await
        .map_err(|e| store_failure(state.logger().as_ref(), "update_cat", e))?;

    Ok(StatusCode::OK)
}

/// `GET /cats`
pub async fn list_cats<S: CatStore>(
    State(state): State<ServerState<S>>,
) -> Result<Response, ServerError> {
    let cats = state
        .store()
        .list_cats()
        .await
        .map_err(|e| store_failure(state.logger().as_ref(), "list_cats", e))?;

    Ok(encode_json(state.logger().as_ref(), StatusCode::OK, &cats))
}

/// Router fallback for unknown paths
pub async fn not_found(uri: Uri) -> ServerError {
    ServerError::RouteNotFound {
        path: uri.path().to_string(),
    }
}

/// Fallback for known paths hit with an unsupported method
pub async fn method_not_allowed(method: Method, uri: Uri) -> ServerError {
    ServerError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

/// Log and count a store failure, then map it to the client-facing error
fn store_failure(logger: &dyn Logger, operation: &'static str, err: StoreError) -> ServerError {
    if !err.is_not_found() {
        logger.error(
            "store operation failed",
            &[("operation", &operation), ("error", &err)],
        );
        inc_store_errors(operation);
    }
    ServerError::from_store(operation, err)
}

/// Serialize `value` as the response body
///
/// The status is decided before encoding. If encoding fails the failure is
/// logged and the response keeps `status` with an empty body.
fn encode_json<T: Serialize>(logger: &dyn Logger, status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Err(e) => {
            logger.error("failed to encode response", &[("error", &e)]);
            status.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Mutex};

    use axum::body::to_bytes;
    use tracing::Level;

    use super::*;
    use crate::logging::Field;

    #[derive(Debug, Default)]
    struct Errors(Mutex<Vec<String>>);

    impl Logger for Errors {
        fn log(&self, level: Level, message: &str, _fields: &[Field<'_>]) {
            if level == Level::ERROR {
                self.0.lock().expect("lock").push(message.to_string());
            }
        }
    }

    #[tokio::test]
    async fn encoded_bodies_are_labelled_json() {
        let logger = Errors::default();
        let response = encode_json(&logger, StatusCode::OK, &vec![1, 2, 3]);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        assert_eq!(&body[..], b"[1,2,3]");
        assert!(logger.0.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn encode_failure_keeps_status() {
        // non-string map keys cannot be encoded as JSON
        let mut value = BTreeMap::new();
        value.insert((1, 2), "pair");

        let logger = Errors::default();
        let response = encode_json(&logger, StatusCode::OK, &value);
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        assert!(body.is_empty());
        assert_eq!(
            *logger.0.lock().expect("lock"),
            vec!["failed to encode response".to_string()]
        );
    }

    #[test]
    fn not_found_from_store_is_not_logged() {
        let logger = Errors::default();
        let err = store_failure(&logger, "get_cat", StoreError::NotFound { cat_id: 4 });

        assert!(matches!(err, ServerError::NotFound { cat_id: 4 }));
        assert!(logger.0.lock().expect("lock").is_empty());
    }

    #[test]
    fn backend_failures_are_logged() {
        let logger = Errors::default();
        let err = store_failure(
            &logger,
            "list_cats",
            StoreError::Unavailable {
                message: "down".to_string(),
            },
        );

        assert!(matches!(err, ServerError::Store { operation: "list_cats", .. }));
        assert_eq!(logger.0.lock().expect("lock").len(), 1);
    }
}
