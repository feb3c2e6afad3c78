// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Custom extractors for improved error handling
//!
//! This module provides the identifier and JSON body extractors used by the
//! cat handlers. Both reject bad input with a 400 before the handler body
//! runs, so no store call is ever made for a malformed request.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::CONTENT_TYPE, request::Parts},
};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use shared_types::CatId;

use crate::error::ServerError;

/// Path prefix carrying a cat identifier
pub const CAT_PATH_PREFIX: &str = "/cat/";

mod error_hints {
    pub const MISSING_COMMA: &str =
        "check for missing or extra commas between object properties or array elements";
    pub const MISSING_BRACE: &str = "check for missing closing brace '}' for JSON object";
    pub const MISSING_QUOTES: &str =
        "check for missing or improperly escaped quotes around string values";
    pub const CONTROL_CHARS: &str = "JSON contains invalid control characters that must be escaped";
    pub const EXPECTED_VALUE: &str =
        "expected a valid JSON value (string, number, boolean, null, object, or array)";
    pub const DEFAULT_SYNTAX: &str = "check JSON formatting and structure";
    pub const EMPTY_BODY: &str = "request body is empty, expected valid JSON";
    pub const TRUNCATED_JSON: &str =
        "unexpected end of JSON input, request appears to be truncated";
}

const MAX_JSON_PAYLOAD_SIZE: usize = 1024 * 1024; // 1MB limit

/// Identifier parsed from the path segment following `/cat/`
///
/// The remainder of the path is percent-decoded, then parsed as a base-10
/// `i32`; anything else (empty, non-numeric, out of range, extra segments,
/// invalid UTF-8 after decoding) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatIdPath(pub CatId);

impl CatIdPath {
    /// Parse the identifier out of a request path
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidId` if the path does not end in a valid identifier.
    pub fn from_path(path: &str) -> Result<Self, ServerError> {
        let segment = path.strip_prefix(CAT_PATH_PREFIX).unwrap_or(path);
        let invalid = || ServerError::InvalidId {
            segment: segment.to_string(),
        };

        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| invalid())?;
        decoded.parse::<CatId>().map(CatIdPath).map_err(|_| invalid())
    }
}

impl<S> FromRequestParts<S> for CatIdPath
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_path(parts.uri.path())
    }
}

/// Strict JSON extractor
///
/// Unknown fields are rejected by the target type (`deny_unknown_fields`);
/// this extractor adds content-type, size and emptiness checks and turns every
/// failure into a `ServerError::JsonError` with a readable hint.
#[derive(Debug)]
pub struct JsonExtractor<T>(pub T);

impl<T, S> FromRequest<S> for JsonExtractor<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Self::extract_json(req, state).await
    }
}

impl<T> JsonExtractor<T>
where
    T: DeserializeOwned,
{
    async fn extract_json<S>(req: Request, state: &S) -> Result<Self, ServerError>
    where
        S: Send + Sync,
    {
        // Validate content-type if present
        if let Some(content_type) = req.headers().get(CONTENT_TYPE)
            && let Ok(content_type_str) = content_type.to_str()
            && !content_type_str.starts_with("application/json")
        {
            return Err(ServerError::JsonError {
                message: format!(
                    "invalid content-type: expected 'application/json', got '{content_type_str}'"
                ),
            });
        }

        let bytes = match axum::body::Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) => {
                return Err(ServerError::JsonError {
                    message: format!("failed to read request body: {rejection}"),
                });
            }
        };

        if bytes.len() > MAX_JSON_PAYLOAD_SIZE {
            return Err(ServerError::JsonError {
                message: format!(
                    "request body too large: {} bytes (max: {} bytes)",
                    bytes.len(),
                    MAX_JSON_PAYLOAD_SIZE
                ),
            });
        }

        if bytes.is_empty() {
            return Err(ServerError::JsonError {
                message: error_hints::EMPTY_BODY.to_string(),
            });
        }

        Self::parse(&bytes)
    }

    fn parse(bytes: &[u8]) -> Result<Self, ServerError> {
        serde_json::from_slice::<T>(bytes)
            .map(JsonExtractor)
            .map_err(|err| {
                let message = if err.is_eof() {
                    error_hints::TRUNCATED_JSON.to_string()
                } else if err.is_syntax() {
                    format!(
                        "invalid JSON syntax at line {}, column {}: {}",
                        err.line(),
                        err.column(),
                        json_syntax_hint(&err)
                    )
                } else if err.is_data() {
                    format!("JSON data validation failed: {}", data_validation_hint(&err))
                } else {
                    format!("JSON parsing error: {err}")
                };
                ServerError::JsonError { message }
            })
    }
}

/// Provides helpful hints for JSON syntax errors
fn json_syntax_hint(err: &serde_json::Error) -> &'static str {
    let err_msg = err.to_string();

    if err_msg.contains("expected ','") || err_msg.contains("trailing comma") {
        error_hints::MISSING_COMMA
    } else if err_msg.contains("expected '}'") {
        error_hints::MISSING_BRACE
    } else if err_msg.contains("expected '\"'") || err_msg.contains("key must be a string") {
        error_hints::MISSING_QUOTES
    } else if err_msg.contains("control character") {
        error_hints::CONTROL_CHARS
    } else if err_msg.contains("expected value") {
        error_hints::EXPECTED_VALUE
    } else {
        error_hints::DEFAULT_SYNTAX
    }
}

/// Provides helpful hints for data validation errors
fn data_validation_hint(err: &serde_json::Error) -> String {
    let err_msg = err.to_string();

    if err_msg.contains("invalid type") {
        if err_msg.contains("expected a string") {
            format!("expected a string value, but received a different data type ({err_msg})")
        } else if err_msg.contains("expected i32") || err_msg.contains("expected integer") {
            format!("expected an integer value, but received a different data type ({err_msg})")
        } else {
            format!("data type mismatch: {err_msg}")
        }
    } else if err_msg.contains("missing field") {
        format!("required field is missing: {err_msg}")
    } else if err_msg.contains("unknown field") {
        format!("unrecognized field found: {err_msg}")
    } else {
        err_msg
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{HeaderValue, Method},
    };
    use shared_types::NewCat;

    use super::*;

    fn create_request(body: &str) -> Request {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/cat")
            .body(Body::from(body.to_string()))
            .expect("request builds");

        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        req
    }

    async fn json_error(body: &str) -> String {
        match JsonExtractor::<NewCat>::from_request(create_request(body), &()).await {
            Err(ServerError::JsonError { message }) => message,
            other => unreachable!("expected JsonError, got {other:?}"),
        }
    }

    #[test]
    fn parses_numeric_ids() {
        assert_eq!(CatIdPath::from_path("/cat/42").ok(), Some(CatIdPath(42)));
        assert_eq!(CatIdPath::from_path("/cat/-3").ok(), Some(CatIdPath(-3)));
    }

    #[test]
    fn decodes_percent_encoded_ids() {
        assert_eq!(CatIdPath::from_path("/cat/%31").ok(), Some(CatIdPath(1)));
        assert_eq!(CatIdPath::from_path("/cat/4%32").ok(), Some(CatIdPath(42)));
        assert_eq!(CatIdPath::from_path("/cat/%2D3").ok(), Some(CatIdPath(-3)));
    }

    #[test]
    fn rejects_malformed_ids() {
        for path in [
            "/cat/",
            "/cat/abc",
            "/cat/1.5",
            "/cat/12/extra",
            "/cat/12%2Fextra",
            "/cat/99999999999",
            "/cat/%FF",
        ] {
            let err = CatIdPath::from_path(path).expect_err(path);
            assert!(matches!(err, ServerError::InvalidId { .. }), "{path}");
        }
    }

    #[tokio::test]
    async fn valid_json_parsing() {
        let req = create_request(r#"{"name": "Tom", "breed": "tabby", "age": 3}"#);
        let JsonExtractor(cat) = JsonExtractor::<NewCat>::from_request(req, &())
            .await
            .expect("valid body");

        assert_eq!(cat.name, "Tom");
        assert_eq!(cat.age, 3);
    }

    #[tokio::test]
    async fn empty_body_error() {
        assert!(json_error("").await.contains("request body is empty"));
    }

    #[tokio::test]
    async fn truncated_body_error() {
        let message = json_error(r#"{"name": "Tom", "breed": "tabby""#).await;
        assert!(message.contains("unexpected end of JSON input"));
    }

    #[tokio::test]
    async fn syntax_error_with_comma() {
        let message = json_error(r#"{"name": "Tom",, "breed": "tabby", "age": 3}"#).await;
        assert!(message.contains("invalid JSON syntax"));
        assert!(message.contains("line"));
    }

    #[tokio::test]
    async fn unknown_field_error() {
        let message =
            json_error(r#"{"name": "Tom", "breed": "tabby", "age": 3, "color": "grey"}"#).await;
        assert!(message.contains("unrecognized field found"));
        assert!(message.contains("color"));
    }

    #[tokio::test]
    async fn type_mismatch_error() {
        let message = json_error(r#"{"name": "Tom", "breed": "tabby", "age": "three"}"#).await;
        assert!(message.contains("JSON data validation failed"));
    }

    #[tokio::test]
    async fn missing_field_error() {
        let message = json_error(r#"{"name": "Tom"}"#).await;
        assert!(message.contains("required field is missing"));
    }

    #[tokio::test]
    async fn wrong_content_type_error() {
        let mut req = create_request(r#"{"name": "Tom", "breed": "tabby", "age": 3}"#);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let result = JsonExtractor::<NewCat>::from_request(req, &()).await;
        assert!(matches!(result, Err(ServerError::JsonError { .. })));
    }
}
