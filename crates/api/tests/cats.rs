// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the cat resource endpoints

mod fixtures;

use axum::http::StatusCode;
use fixtures::TestServer;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

fn tom() -> Value {
    json!({ "name": "Tom", "breed": "tabby", "age": 3 })
}

#[tokio::test]
async fn create_then_get_returns_record() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/cat"))
        .json(&tom())
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.text().await.expect("body").is_empty());

    let response = server
        .client
        .get(server.url("/cat/1"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let cat: Value = response.json().await.expect("json body");
    assert_eq!(
        cat,
        json!({ "cat_id": 1, "name": "Tom", "breed": "tabby", "age": 3 })
    );
}

#[tokio::test]
async fn malformed_bodies_are_rejected_without_store_calls() {
    let server = TestServer::start().await;

    let bodies = [
        "",
        "{",
        r#"{"name": "Tom", "breed": "tabby"}"#,
        r#"{"name": "Tom", "breed": "tabby", "age": "three"}"#,
        r#"{"name": "Tom", "breed": "tabby", "age": 3, "color": "grey"}"#,
    ];

    for body in bodies {
        let response = server
            .client
            .post(server.url("/cat"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");

        let error: Value = response.json().await.expect("json error body");
        assert_eq!(error["status"], 400);
        assert!(error["error"].as_str().is_some_and(|m| !m.is_empty()));
    }

    assert_eq!(server.store.calls(), 0);
}

#[tokio::test]
async fn malformed_update_bodies_are_rejected_without_store_calls() {
    let server = TestServer::start().await;

    let bodies = [
        "",
        "{",
        "not json",
        r#"{"name": "Tom", "breed": "tabby""#,
        r#"{"name": "Tom", "breed": "tabby"}"#,
        r#"{"name": "Tom", "breed": 7, "age": 3}"#,
        r#"{"name": "Tom", "breed": "tabby", "age": "three"}"#,
        r#"{"cat_id": 2, "name": "Tom", "breed": "tabby", "age": 3}"#,
    ];

    for body in bodies {
        let response = server
            .client
            .put(server.url("/cat/1"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");

        let error: Value = response.json().await.expect("json error body");
        assert_eq!(error["status"], 400);
    }

    assert_eq!(server.store.calls(), 0);
}

#[tokio::test]
async fn malformed_identifiers_are_rejected_without_store_calls() {
    let server = TestServer::start().await;

    for path in [
        "/cat/abc",
        "/cat/",
        "/cat/1.5",
        "/cat/1/2",
        "/cat/99999999999",
        "/cat/%FF",
        "/cat/%3",
    ] {
        let response = server
            .client
            .get(server.url(path))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
    }

    let response = server
        .client
        .put(server.url("/cat/abc"))
        .json(&tom())
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.store.calls(), 0);
}

#[tokio::test]
async fn percent_encoded_identifier_is_decoded() {
    let server = TestServer::start().await;

    server
        .client
        .post(server.url("/cat"))
        .json(&tom())
        .send()
        .await
        .expect("Failed to send request");

    let response = server
        .client
        .get(server.url("/cat/%31"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let cat: Value = response.json().await.expect("json body");
    assert_eq!(cat["cat_id"], 1);
}

#[tokio::test]
async fn unknown_identifier_is_not_found() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/cat/42"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: Value = response.json().await.expect("json error body");
    assert_eq!(error["status"], 404);
}

#[tokio::test]
async fn update_overwrites_fields() {
    let server = TestServer::start().await;

    server
        .client
        .post(server.url("/cat"))
        .json(&tom())
        .send()
        .await
        .expect("Failed to send request");

    let response = server
        .client
        .put(server.url("/cat/1"))
        .json(&json!({ "name": "Thomas", "breed": "tabby", "age": 4 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let cat: Value = server
        .client
        .get(server.url("/cat/1"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("json body");
    assert_eq!(cat["name"], "Thomas");
    assert_eq!(cat["age"], 4);
}

#[tokio::test]
async fn update_of_unknown_identifier_is_a_no_op() {
    let server = TestServer::start().await;

    server
        .client
        .post(server.url("/cat"))
        .json(&tom())
        .send()
        .await
        .expect("Failed to send request");
    let before = server.store.snapshot();

    let response = server
        .client
        .put(server.url("/cat/99"))
        .json(&json!({ "name": "Ghost", "breed": "none", "age": 0 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.store.snapshot(), before);
}

#[tokio::test]
async fn empty_list_is_an_empty_array() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/cats"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "[]");
}

#[tokio::test]
async fn list_returns_every_record() {
    let server = TestServer::start().await;

    for name in ["Tom", "Felix"] {
        server
            .client
            .post(server.url("/cat"))
            .json(&json!({ "name": name, "breed": "tabby", "age": 2 }))
            .send()
            .await
            .expect("Failed to send request");
    }

    let cats: Vec<Value> = server
        .client
        .get(server.url("/cats"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("json body");

    let names: Vec<&str> = cats.iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(names, ["Tom", "Felix"]);
}

#[tokio::test]
async fn store_failures_are_internal_errors() {
    let server = TestServer::start().await;
    server.store.set_failing(true);

    let requests = [
        server.client.get(server.url("/cats")),
        server.client.get(server.url("/cat/1")),
        server.client.post(server.url("/cat")).json(&tom()),
        server.client.put(server.url("/cat/1")).json(&tom()),
    ];

    for request in requests {
        let response = request.send().await.expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let error: Value = response.json().await.expect("json error body");
        assert_eq!(error["error"], "internal server error");
    }
    assert_eq!(server.store.calls(), 4);
}

#[tokio::test]
async fn every_response_is_json() {
    let server = TestServer::start().await;
    server
        .client
        .post(server.url("/cat"))
        .json(&tom())
        .send()
        .await
        .expect("Failed to send request");

    let requests = [
        server.client.get(server.url("/cats")),
        server.client.get(server.url("/cat/1")),
        server.client.get(server.url("/cat/7")),
        server.client.get(server.url("/cat/x")),
        server.client.post(server.url("/cat")).json(&tom()),
        server.client.delete(server.url("/cat/7")),
        server.client.get(server.url("/nope")),
    ];

    for request in requests {
        let response = request.send().await.expect("Failed to send request");
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/json",
            "{}",
            response.url()
        );
    }
}
