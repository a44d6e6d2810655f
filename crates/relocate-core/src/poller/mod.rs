//! Status polling
//!
//! Periodically asks each provider about an earlier update until every
//! target reaches a terminal status, the optional deadline passes, or the
//! caller cancels.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let handle = StatusPoller::start(registry, targets, &config.polling)?;
//! let mut updates = handle.updates();
//! while let Some(snapshot) = updates.next().await {
//!     println!("{}% complete", snapshot.progress().percentage);
//!     if snapshot.finished.is_some() {
//!         break;
//!     }
//! }
//! ```
//!
//! Dropping the [`PollHandle`] cancels polling. RPA providers never report
//! completion on their own, so a poll over them only ends by deadline or
//! cancellation.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::error::{Error, Result};
use crate::model::ServiceCredentials;
use crate::registry::ServiceRegistry;
use crate::result::{Progress, ServiceOutcome, ServiceUpdateResult, UpdateStatus};

/// One earlier update to keep an eye on
#[derive(Debug, Clone)]
pub struct PollTarget {
    pub service_id: String,
    pub credentials: ServiceCredentials,
    pub reference: String,
    /// Status known before polling starts
    pub status: UpdateStatus,
}

impl PollTarget {
    pub fn new(
        service_id: impl Into<String>,
        credentials: ServiceCredentials,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            credentials,
            reference: reference.into(),
            status: UpdateStatus::Pending,
        }
    }

    /// Target for a move outcome, if the provider issued a reference
    pub fn from_outcome(outcome: &ServiceOutcome, credentials: ServiceCredentials) -> Option<Self> {
        let reference = outcome.reference()?;
        Some(Self {
            status: outcome.status,
            ..Self::new(outcome.service_id.clone(), credentials, reference)
        })
    }
}

/// Why polling ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStop {
    AllTerminal,
    TimedOut,
    Cancelled,
}

/// Latest knowledge about one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetState {
    pub service_id: String,
    pub reference: String,
    pub status: UpdateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<ServiceUpdateResult>,
    /// Error from the most recent poll, cleared by the next answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub polls: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_polled: Option<DateTime<Utc>>,
}

/// Everything known after a polling round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
    pub round: u64,
    pub targets: Vec<TargetState>,
    /// Set on the last snapshot a poll publishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<PollStop>,
}

impl PollSnapshot {
    pub fn progress(&self) -> Progress {
        Progress::from_statuses(self.targets.iter().map(|t| t.status))
    }

    pub fn all_terminal(&self) -> bool {
        self.targets.iter().all(|t| t.status.is_terminal())
    }

    pub fn status(&self, service_id: &str) -> Option<UpdateStatus> {
        self.targets
            .iter()
            .find(|t| t.service_id == service_id)
            .map(|t| t.status)
    }
}

struct Tracked {
    credentials: ServiceCredentials,
    state: TargetState,
}

/// Entry point for status polling
pub struct StatusPoller;

impl StatusPoller {
    /// Start polling `targets` in a background task
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `Error::Config` if `config` is invalid.
    pub fn start(
        registry: Arc<ServiceRegistry>,
        targets: Vec<PollTarget>,
        config: &PollingConfig,
    ) -> Result<PollHandle> {
        config.validate()?;

        let tracked: Vec<Tracked> = targets
            .into_iter()
            .map(|target| Tracked {
                credentials: target.credentials,
                state: TargetState {
                    service_id: target.service_id,
                    reference: target.reference,
                    status: target.status,
                    last_result: None,
                    last_error: None,
                    polls: 0,
                    last_polled: None,
                },
            })
            .collect();

        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot(0, &tracked, None));
        let (cancel_tx, cancel_rx) = oneshot::channel();

        info!("Starting status poll over {} target(s)", tracked.len());
        let task = tokio::spawn(run(registry, tracked, config.clone(), snapshot_tx, cancel_rx));

        Ok(PollHandle {
            snapshot_rx,
            cancel_tx: Some(cancel_tx),
            task,
        })
    }
}

/// Handle on a running poll; dropping it cancels the poll
pub struct PollHandle {
    snapshot_rx: watch::Receiver<PollSnapshot>,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<PollStop>,
}

impl PollHandle {
    /// Most recent snapshot
    pub fn snapshot(&self) -> PollSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Stream of snapshots, starting with the current one
    pub fn updates(&self) -> WatchStream<PollSnapshot> {
        WatchStream::new(self.snapshot_rx.clone())
    }

    /// Whether the poll has ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling and return the final snapshot
    ///
    /// Calling this after the poll ended on its own is harmless.
    pub async fn cancel(mut self) -> PollSnapshot {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
        self.finish().await
    }

    /// Wait for the poll to end on its own
    pub async fn wait(mut self) -> PollSnapshot {
        // Keep the sender alive while waiting; dropping it cancels.
        let _cancel_tx = self.cancel_tx.take();
        self.finish().await
    }

    async fn finish(self) -> PollSnapshot {
        let PollHandle {
            snapshot_rx, task, ..
        } = self;
        if let Err(e) = task.await {
            warn!("Status poll task ended abnormally: {}", e);
        }
        let last = snapshot_rx.borrow().clone();
        last
    }
}

fn snapshot(round: u64, tracked: &[Tracked], finished: Option<PollStop>) -> PollSnapshot {
    PollSnapshot {
        round,
        targets: tracked.iter().map(|t| t.state.clone()).collect(),
        finished,
    }
}

async fn run(
    registry: Arc<ServiceRegistry>,
    mut tracked: Vec<Tracked>,
    config: PollingConfig,
    snapshot_tx: watch::Sender<PollSnapshot>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> PollStop {
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = config.timeout().map(|timeout| Instant::now() + timeout);
    let expired = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(expired);

    let mut round = 0;
    let stop = loop {
        if tracked.iter().all(|t| t.state.status.is_terminal()) {
            break PollStop::AllTerminal;
        }

        tokio::select! {
            biased;
            _ = &mut cancel_rx => break PollStop::Cancelled,
            _ = &mut expired => break PollStop::TimedOut,
            _ = ticker.tick() => {}
        }

        round += 1;
        tokio::select! {
            biased;
            _ = &mut cancel_rx => break PollStop::Cancelled,
            _ = &mut expired => break PollStop::TimedOut,
            _ = poll_round(&registry, &mut tracked) => {}
        }

        debug!("Status poll round {} finished", round);
        snapshot_tx.send_replace(snapshot(round, &tracked, None));
    };

    info!("Status poll stopped after {} round(s): {:?}", round, stop);
    snapshot_tx.send_replace(snapshot(round, &tracked, Some(stop)));
    stop
}

async fn poll_round(registry: &ServiceRegistry, tracked: &mut [Tracked]) {
    let polls = tracked
        .iter_mut()
        .filter(|t| !t.state.status.is_terminal())
        .map(|t| poll_one(registry, t));
    join_all(polls).await;
}

async fn poll_one(registry: &ServiceRegistry, tracked: &mut Tracked) {
    let state = &mut tracked.state;
    state.polls += 1;
    state.last_polled = Some(Utc::now());

    match registry
        .check_update_status(&state.service_id, &tracked.credentials, &state.reference)
        .await
    {
        Ok(result) => {
            state.status = result.status();
            state.last_error = if result.success {
                None
            } else {
                Some(result.error.clone().unwrap_or_else(|| result.message.clone()))
            };
            state.last_result = Some(result);
        }
        Err(e @ (Error::ServiceNotFound(_) | Error::Validation { .. })) => {
            warn!("Giving up on {}: {}", state.service_id, e);
            state.status = UpdateStatus::Failed;
            state.last_error = Some(e.to_string());
        }
        Err(e) => {
            debug!("Status check for {} failed, will retry: {}", state.service_id, e);
            state.last_error = Some(e.to_string());
        }
    }
}
