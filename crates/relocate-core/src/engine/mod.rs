//! Move update engine
//!
//! The UpdateEngine is responsible for:
//! - Fanning a move out to every selected provider concurrently
//! - Running each provider's full attempt cycle through the registry
//! - Collecting every outcome independently into a report
//! - Re-running failed providers on request
//!
//! ## Architecture
//!
//! ```text
//!                      ┌────────────────────┐
//!   MoveUpdateRequest ─▶│   UpdateEngine     │─── EngineEvent ──▶ (monitoring)
//!                      └────────────────────┘
//!                                │ one task per service
//!          ┌─────────────────────┼─────────────────────┐
//!          ▼                     ▼                     ▼
//!  ┌───────────────┐     ┌───────────────┐     ┌───────────────┐
//!  │ registry      │     │ registry      │     │ registry      │
//!  │ .update_address│    │ .update_address│    │ .update_address│
//!  └───────────────┘     └───────────────┘     └───────────────┘
//!          │                     │                     │
//!          └──────────────▶ MoveUpdateReport ◀─────────┘
//! ```
//!
//! ## Isolation
//!
//! Each provider runs in its own task with its own session. A provider that
//! fails, errors or panics only affects its own outcome; the engine waits
//! for every task to settle before building the report.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::Error;
use crate::model::{Address, MoveStatus, ServiceCredentials};
use crate::registry::ServiceRegistry;
use crate::result::{MoveUpdateReport, ServiceOutcome, UpdateStatus};

/// One provider selected for a move, with the credentials to use
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub service_id: String,
    #[serde(default)]
    pub credentials: ServiceCredentials,
}

/// Everything needed to update every selected provider for one move
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveUpdateRequest {
    #[serde(default = "generated_move_id")]
    pub move_id: String,
    pub old_address: Address,
    pub new_address: Address,
    pub services: Vec<ServiceRequest>,
}

fn generated_move_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl MoveUpdateRequest {
    /// Request for a move with a generated id
    pub fn new(old_address: Address, new_address: Address) -> Self {
        Self {
            move_id: generated_move_id(),
            old_address,
            new_address,
            services: Vec::new(),
        }
    }

    /// Add a provider to the request
    pub fn with_service(
        mut self,
        service_id: impl Into<String>,
        credentials: ServiceCredentials,
    ) -> Self {
        self.services.push(ServiceRequest {
            service_id: service_id.into(),
            credentials,
        });
        self
    }

    /// Credentials supplied for a provider
    pub fn credentials_for(&self, service_id: &str) -> Option<&ServiceCredentials> {
        self.services
            .iter()
            .find(|s| s.service_id == service_id)
            .map(|s| &s.credentials)
    }
}

/// Events emitted by the UpdateEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Provider attempt started
    UpdateStarted {
        move_id: String,
        service_id: String,
    },

    /// Provider reflects the new address
    UpdateSucceeded {
        move_id: String,
        service_id: String,
        reference: Option<String>,
    },

    /// Provider accepted the change but has not applied it yet
    UpdatePending {
        move_id: String,
        service_id: String,
        reference: Option<String>,
    },

    /// Draft prepared, waiting on a human
    AwaitingVerification {
        move_id: String,
        service_id: String,
        verification_url: Option<String>,
    },

    /// Provider attempt failed
    UpdateFailed {
        move_id: String,
        service_id: String,
        error: String,
        retry_count: u32,
    },

    /// Every provider attempt of the move settled
    MoveFinished {
        move_id: String,
        status: MoveStatus,
    },
}

/// Fan-out engine for move updates
///
/// The engine holds no per-move state; concurrent calls for different moves
/// are independent.
pub struct UpdateEngine {
    /// Registry used to route each provider attempt
    registry: Arc<ServiceRegistry>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl UpdateEngine {
    /// Create a new update engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        registry: Arc<ServiceRegistry>,
        config: &EngineConfig,
    ) -> crate::Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        Ok((
            Self {
                registry,
                event_tx: tx,
            },
            rx,
        ))
    }

    /// Registry this engine routes through
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Update every provider selected in `request`
    ///
    /// Outcomes are returned in request order. Providers listed more than
    /// once are attempted once.
    pub async fn update_move(&self, request: &MoveUpdateRequest) -> MoveUpdateReport {
        let targets = dedup_services(&request.services)
            .into_iter()
            .map(|service| (service, 0))
            .collect();

        let outcomes = self.fan_out(request, targets).await;
        self.finish(request, outcomes)
    }

    /// Re-run only the providers that failed in `report`
    ///
    /// Outcomes that did not fail are carried over unchanged; retried ones
    /// have their retry count incremented.
    pub async fn retry_failed(
        &self,
        request: &MoveUpdateRequest,
        report: &MoveUpdateReport,
    ) -> MoveUpdateReport {
        let targets: Vec<(ServiceRequest, u32)> = report
            .failed()
            .filter_map(|outcome| {
                let credentials = request.credentials_for(&outcome.service_id)?;
                Some((
                    ServiceRequest {
                        service_id: outcome.service_id.clone(),
                        credentials: credentials.clone(),
                    },
                    outcome.retry_count + 1,
                ))
            })
            .collect();

        if targets.is_empty() {
            debug!("No failed services to retry for move {}", request.move_id);
            return report.clone();
        }

        info!(
            "Retrying {} failed service(s) for move {}",
            targets.len(),
            request.move_id
        );

        let mut merged = report.clone();
        for outcome in self.fan_out(request, targets).await {
            merged.upsert(outcome);
        }

        self.emit_event(EngineEvent::MoveFinished {
            move_id: merged.move_id.clone(),
            status: merged.move_status(),
        });
        merged
    }

    /// Run one task per target and wait for all of them
    async fn fan_out(
        &self,
        request: &MoveUpdateRequest,
        targets: Vec<(ServiceRequest, u32)>,
    ) -> Vec<ServiceOutcome> {
        let old_address = Arc::new(request.old_address.clone());
        let new_address = Arc::new(request.new_address.clone());

        let handles: Vec<_> = targets
            .into_iter()
            .map(|(service, retry_count)| {
                let registry = Arc::clone(&self.registry);
                let old_address = Arc::clone(&old_address);
                let new_address = Arc::clone(&new_address);
                let event_tx = self.event_tx.clone();
                let move_id = request.move_id.clone();
                let service_id = service.service_id.clone();

                let handle = tokio::spawn(async move {
                    emit(
                        &event_tx,
                        EngineEvent::UpdateStarted {
                            move_id: move_id.clone(),
                            service_id: service.service_id.clone(),
                        },
                    );

                    let call = registry
                        .update_address(
                            &service.service_id,
                            &service.credentials,
                            &old_address,
                            &new_address,
                        )
                        .await;

                    let mut outcome = ServiceOutcome::from_call(&service.service_id, &call)
                        .with_retry_count(retry_count);
                    if let Ok(descriptor) = registry.descriptor(&service.service_id) {
                        outcome = outcome.with_descriptor(&descriptor);
                    }
                    emit(&event_tx, outcome_event(&move_id, &outcome));
                    outcome
                });

                (service_id, retry_count, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (service_id, retry_count, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let error =
                        Error::infrastructure(format!("Update task aborted: {}", join_error));
                    warn!("Update task for {} did not complete: {}", service_id, join_error);
                    let mut outcome =
                        ServiceOutcome::from_error(&service_id, &error).with_retry_count(retry_count);
                    if let Ok(descriptor) = self.registry.descriptor(&service_id) {
                        outcome = outcome.with_descriptor(&descriptor);
                    }
                    self.emit_event(outcome_event(&request.move_id, &outcome));
                    outcome
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    fn finish(&self, request: &MoveUpdateRequest, outcomes: Vec<ServiceOutcome>) -> MoveUpdateReport {
        let report = MoveUpdateReport {
            move_id: request.move_id.clone(),
            outcomes,
        };

        let progress = report.progress();
        info!(
            "Move {} settled: {} completed, {} pending, {} failed",
            report.move_id, progress.completed, progress.pending, progress.failed
        );

        self.emit_event(EngineEvent::MoveFinished {
            move_id: report.move_id.clone(),
            status: report.move_status(),
        });
        report
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        emit(&self.event_tx, event);
    }
}

/// Send an event, logging a warning if the channel is full (backpressure)
fn emit(event_tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    if let Err(mpsc::error::TrySendError::Full(_)) = event_tx.try_send(event) {
        warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
    }
}

fn outcome_event(move_id: &str, outcome: &ServiceOutcome) -> EngineEvent {
    let move_id = move_id.to_string();
    let service_id = outcome.service_id.clone();
    match outcome.status {
        UpdateStatus::Completed => EngineEvent::UpdateSucceeded {
            move_id,
            service_id,
            reference: outcome.reference().map(str::to_string),
        },
        UpdateStatus::Pending => EngineEvent::UpdatePending {
            move_id,
            service_id,
            reference: outcome.reference().map(str::to_string),
        },
        UpdateStatus::AwaitingVerification => EngineEvent::AwaitingVerification {
            move_id,
            service_id,
            verification_url: outcome
                .result
                .as_ref()
                .and_then(|r| r.verification_url.clone()),
        },
        UpdateStatus::Failed => EngineEvent::UpdateFailed {
            move_id,
            service_id,
            error: outcome.error_message.clone().unwrap_or_default(),
            retry_count: outcome.retry_count,
        },
    }
}

fn dedup_services(services: &[ServiceRequest]) -> Vec<ServiceRequest> {
    let mut seen = HashSet::new();
    services
        .iter()
        .filter(|service| {
            let first = seen.insert(service.service_id.as_str());
            if !first {
                warn!("Service {} listed twice, ignoring duplicate", service.service_id);
            }
            first
        })
        .cloned()
        .collect()
}
