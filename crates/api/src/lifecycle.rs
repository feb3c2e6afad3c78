// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Process lifecycle coordination
//!
//! A [`LifecycleGroup`] runs long-lived members (listeners, the signal
//! watcher) as tasks sharing one [`CancellationToken`]. The first member to
//! finish, for whatever reason, cancels the token. The others then get
//! [`ShutdownConfig::graceful_timeout`] to drain; whatever is still running
//! after that is aborted and given [`ShutdownConfig::force_timeout`] to
//! unwind.

use std::{any::Any, collections::HashMap, fmt, sync::Arc, time::Duration};

use tokio::task::{Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    logging::Logger,
};

const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 3;
const DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS: u64 = 1;

/// Configuration for shutdown behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownConfig {
    /// Time the remaining members get to drain once the token is cancelled
    pub graceful_timeout: Duration,
    /// Time aborted members get to unwind
    pub force_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
            force_timeout: Duration::from_secs(DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

impl ShutdownConfig {
    /// Grace period from the server configuration, default force timeout
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            graceful_timeout: config.shutdown_timeout_seconds.value(),
            ..Self::default()
        }
    }
}

/// How a member finished on its own terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberExit {
    /// An OS signal was received
    Signal(&'static str),
    /// The member returned normally
    Stopped,
}

/// Why the group shut down
#[derive(Debug)]
pub enum ExitReason {
    /// A signal watcher saw an OS signal
    Signal(&'static str),
    /// The shared token was cancelled from outside the group
    Cancelled,
    /// A member returned without being asked to
    Stopped,
    /// A member returned an error
    Failed(ServerError),
    /// A member panicked
    Panicked(String),
}

impl ExitReason {
    /// Whether the process should report a failure exit status
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed(_) | Self::Panicked(_))
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "received {name}"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Stopped => f.write_str("stopped unexpectedly"),
            Self::Failed(e) => write!(f, "failed: {e}"),
            Self::Panicked(message) => write!(f, "panicked: {message}"),
        }
    }
}

/// Outcome of [`LifecycleGroup::run`]
#[derive(Debug)]
pub struct GroupExit {
    /// Member whose exit triggered shutdown, `None` if the token was cancelled externally
    pub member: Option<&'static str>,
    /// Why the group shut down
    pub reason: ExitReason,
    /// Members that had to be aborted after the grace period, sorted by name
    pub forced: Vec<&'static str>,
}

/// Set of members where the first exit cancels the rest
#[derive(Debug)]
pub struct LifecycleGroup {
    token: CancellationToken,
    shutdown: ShutdownConfig,
    logger: Arc<dyn Logger>,
    tasks: JoinSet<ServerResult<MemberExit>>,
    names: HashMap<Id, &'static str>,
}

impl LifecycleGroup {
    /// Create an empty group sharing `token`
    pub fn new(token: CancellationToken, shutdown: ShutdownConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            token,
            shutdown,
            logger,
            tasks: JoinSet::new(),
            names: HashMap::new(),
        }
    }

    /// Spawn a member
    ///
    /// `member` receives a clone of the group token and is expected to return
    /// once it is cancelled. Must be called from within a Tokio runtime.
    pub fn add<F, Fut>(&mut self, name: &'static str, member: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ServerResult<MemberExit>> + Send + 'static,
    {
        let handle = self.tasks.spawn(member(self.token.clone()));
        self.names.insert(handle.id(), name);
    }

    /// Token shared by every member
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run until the first member exits or the token is cancelled, then drain
    pub async fn run(mut self) -> GroupExit {
        let first = tokio::select! {
            joined = self.tasks.join_next_with_id() => Some(joined),
            () = self.token.cancelled() => None,
        };
        let (member, reason) = match first {
            Some(Some(joined)) => self.classify(joined),
            Some(None) => (None, ExitReason::Stopped),
            None => (None, ExitReason::Cancelled),
        };

        let trigger = member.unwrap_or("external");
        if reason.is_failure() {
            self.logger
                .error("shutting down", &[("member", &trigger), ("reason", &reason)]);
        } else {
            self.logger
                .info("shutting down", &[("member", &trigger), ("reason", &reason)]);
        }
        self.token.cancel();

        let forced = self.drain().await;

        GroupExit {
            member,
            reason,
            forced,
        }
    }

    /// Wait for the remaining members, aborting stragglers
    async fn drain(&mut self) -> Vec<&'static str> {
        let graceful = self.shutdown.graceful_timeout;
        if tokio::time::timeout(graceful, self.join_remaining())
            .await
            .is_ok()
        {
            return Vec::new();
        }

        let mut forced: Vec<&'static str> = self.names.values().copied().collect();
        forced.sort_unstable();
        let grace_ms = graceful.as_millis();
        for name in &forced {
            self.logger.warn(
                "member did not stop within grace period, aborting",
                &[("member", name), ("grace_ms", &grace_ms)],
            );
        }

        self.tasks.abort_all();
        if tokio::time::timeout(self.shutdown.force_timeout, self.join_remaining())
            .await
            .is_err()
        {
            let pending = self.tasks.len();
            self.logger
                .error("members still running after abort", &[("count", &pending)]);
            self.tasks.detach_all();
        }
        forced
    }

    async fn join_remaining(&mut self) {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            let (member, reason) = self.classify(joined);
            let member = member.unwrap_or("unknown");
            match reason {
                ExitReason::Failed(ServerError::TaskJoin { ref source }) if source.is_cancelled() => {
                    self.logger.debug("member aborted", &[("member", &member)]);
                }
                reason if reason.is_failure() => {
                    self.logger.error(
                        "member failed during shutdown",
                        &[("member", &member), ("reason", &reason)],
                    );
                }
                _ => self.logger.debug("member stopped", &[("member", &member)]),
            }
        }
    }

    fn classify(
        &mut self,
        joined: Result<(Id, ServerResult<MemberExit>), JoinError>,
    ) -> (Option<&'static str>, ExitReason) {
        match joined {
            Ok((id, result)) => {
                let reason = match result {
                    Ok(MemberExit::Signal(signal)) => ExitReason::Signal(signal),
                    Ok(MemberExit::Stopped) if self.token.is_cancelled() => ExitReason::Cancelled,
                    Ok(MemberExit::Stopped) => ExitReason::Stopped,
                    Err(e) => ExitReason::Failed(e),
                };
                (self.names.remove(&id), reason)
            }
            Err(join_error) => {
                let member = self.names.remove(&join_error.id());
                let reason = match join_error.try_into_panic() {
                    Ok(payload) => ExitReason::Panicked(panic_message(payload.as_ref())),
                    Err(join_error) => ExitReason::Failed(join_error.into()),
                };
                (member, reason)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Lifecycle member that resolves on SIGINT/SIGTERM (CTRL+C off unix)
///
/// Returns [`MemberExit::Stopped`] if the token is cancelled first.
///
/// # Errors
///
/// Returns `ServerError::Signal` if a signal handler cannot be installed.
pub async fn watch_signals(token: CancellationToken) -> ServerResult<MemberExit> {
    #[cfg(unix)]
    let received = {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| ServerError::Signal {
            message: format!("failed to register SIGTERM handler: {e}"),
        })?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| ServerError::Signal {
            message: format!("failed to register SIGINT handler: {e}"),
        })?;

        async move {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            Ok::<_, ServerError>(name)
        }
    };

    #[cfg(not(unix))]
    let received = async {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| ServerError::Signal {
                message: format!("failed to install CTRL+C handler: {e}"),
            })?;
        Ok::<_, ServerError>("CTRL+C")
    };

    tokio::select! {
        signal = received => Ok(MemberExit::Signal(signal?)),
        () = token.cancelled() => Ok(MemberExit::Stopped),
    }
}
