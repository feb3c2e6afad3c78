// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for coordinated shutdown

mod fixtures;

use std::{sync::Arc, time::Duration};

use api::{ExitReason, LifecycleGroup, MemberExit, ServerError, ShutdownConfig};
use fixtures::{RecordingLogger, TestServer};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn programmatic_shutdown_closes_store_once() {
    let server = TestServer::start().await;
    let store = server.store.clone();
    let logger = server.logger.clone();

    let exit = server.stop().await;

    assert!(matches!(exit.reason, ExitReason::Cancelled));
    assert!(!exit.reason.is_failure());
    assert!(exit.forced.is_empty());
    assert_eq!(store.closes(), 1);
    assert!(logger.records().iter().any(|r| r.message == "store closed"));
}

#[tokio::test]
async fn listeners_stop_accepting_after_shutdown() {
    let server = TestServer::start().await;
    let url = server.url("/cats");
    let client = reqwest::Client::new();

    client.get(&url).send().await.expect("served before shutdown");
    server.stop().await;

    let result = client.get(&url).send().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn failing_member_drains_the_others() {
    let logger = Arc::new(RecordingLogger::default());
    let shutdown = ShutdownConfig {
        graceful_timeout: Duration::from_millis(300),
        force_timeout: Duration::from_millis(300),
    };
    let mut group = LifecycleGroup::new(CancellationToken::new(), shutdown, logger.clone());
    let token = group.token();

    group.add("draining", |token| async move {
        token.cancelled().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(MemberExit::Stopped)
    });
    group.add("stuck", |_| async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(MemberExit::Stopped)
    });
    group.add("listener", |_| async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Err(ServerError::Runtime {
            message: "accept failed".to_string(),
        })
    });

    let exit = tokio::time::timeout(Duration::from_secs(5), group.run())
        .await
        .expect("group finishes within its timeouts");

    assert!(token.is_cancelled());
    assert_eq!(exit.member, Some("listener"));
    assert!(exit.reason.is_failure());
    assert_eq!(exit.forced, vec!["stuck"]);
    assert!(
        logger
            .records()
            .iter()
            .any(|r| r.field("member") == Some("stuck"))
    );
}
