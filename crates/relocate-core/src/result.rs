//! Result and status protocol
//!
//! Every integration answers with a [`ServiceUpdateResult`]. The core derives
//! an [`UpdateStatus`] from it and aggregates per-provider outcomes of a move
//! into a [`MoveUpdateReport`].
//!
//! ```text
//! success=false                      → Failed                (terminal)
//! success=true, verification needed  → AwaitingVerification
//! success=true, accepted not applied → Pending
//! success=true                       → Completed             (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};
use crate::model::MoveStatus;
use crate::traits::ServiceDescriptor;

/// Answer from a single update, status or verification call
///
/// When `requires_user_verification` is true, `success` only means the
/// scripted step worked; a human still has to confirm before the change is
/// final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpdateResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub requires_user_verification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_url: Option<String>,
    /// Accepted by the provider but not applied yet
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

impl ServiceUpdateResult {
    /// A finalized success
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            reference: None,
            screenshot_url: None,
            requires_user_verification: false,
            verification_url: None,
            pending: false,
        }
    }

    /// A business-level failure (provider rejection)
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::succeeded(message)
        }
    }

    /// A scripted step succeeded and a human has to confirm it
    pub fn awaiting_verification(message: impl Into<String>) -> Self {
        Self {
            requires_user_verification: true,
            ..Self::succeeded(message)
        }
    }

    /// Accepted by the provider; a later status check decides the outcome
    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            pending: true,
            ..Self::succeeded(message)
        }
    }

    /// Attach the error detail
    pub fn with_error(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Attach a reference for later status polls
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Attach a screenshot artifact location
    pub fn with_screenshot(mut self, screenshot_url: impl Into<String>) -> Self {
        self.screenshot_url = Some(screenshot_url.into());
        self
    }

    /// Attach the URL a human should open to verify
    pub fn with_verification_url(mut self, url: impl Into<String>) -> Self {
        self.verification_url = Some(url.into());
        self
    }

    /// Status implied by this result
    pub fn status(&self) -> UpdateStatus {
        if !self.success {
            UpdateStatus::Failed
        } else if self.requires_user_verification {
            UpdateStatus::AwaitingVerification
        } else if self.pending {
            UpdateStatus::Pending
        } else {
            UpdateStatus::Completed
        }
    }
}

/// Progress of one provider update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    /// Accepted by the provider, not yet final
    Pending,
    /// Waiting on a human to confirm out-of-band
    AwaitingVerification,
    /// Provider reflects the new address
    Completed,
    /// Rejected, or could not be attempted
    Failed,
}

impl UpdateStatus {
    /// Completed and Failed are terminal; polling stops once everything is
    pub fn is_terminal(self) -> bool {
        matches!(self, UpdateStatus::Completed | UpdateStatus::Failed)
    }
}

/// Outcome of one provider within a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOutcome {
    pub service_id: String,
    /// Display name, when the service is registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_category: Option<String>,
    pub status: UpdateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ServiceUpdateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub retry_count: u32,
    pub last_attempt: DateTime<Utc>,
}

impl ServiceOutcome {
    /// Outcome for a call that returned a result
    pub fn from_result(service_id: impl Into<String>, result: ServiceUpdateResult) -> Self {
        let error_message = if result.success {
            None
        } else {
            Some(result.error.clone().unwrap_or_else(|| result.message.clone()))
        };

        Self {
            service_id: service_id.into(),
            service_name: None,
            service_category: None,
            status: result.status(),
            result: Some(result),
            error_message,
            error_kind: None,
            retry_count: 0,
            last_attempt: Utc::now(),
        }
    }

    /// Outcome for a call that failed with an error
    pub fn from_error(service_id: impl Into<String>, error: &Error) -> Self {
        Self {
            service_id: service_id.into(),
            service_name: None,
            service_category: None,
            status: UpdateStatus::Failed,
            result: None,
            error_message: Some(error.to_string()),
            error_kind: Some(error.kind()),
            retry_count: 0,
            last_attempt: Utc::now(),
        }
    }

    /// Outcome from either branch of an integration call
    pub fn from_call(service_id: impl Into<String>, call: &crate::Result<ServiceUpdateResult>) -> Self {
        match call {
            Ok(result) => Self::from_result(service_id, result.clone()),
            Err(error) => Self::from_error(service_id, error),
        }
    }

    /// Copy the display name and category from a descriptor
    pub fn with_descriptor(mut self, descriptor: &ServiceDescriptor) -> Self {
        self.service_name = Some(descriptor.name.clone());
        self.service_category = Some(descriptor.category.clone());
        self
    }

    /// Set the retry counter
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Reference for status polling, if the provider issued one
    pub fn reference(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.reference.as_deref())
    }
}

/// Counts for a progress display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    /// Pending and awaiting-verification outcomes
    pub pending: usize,
    pub failed: usize,
    /// Completed share, rounded, 0 when there is nothing to do
    pub percentage: u8,
}

impl Progress {
    /// Tally a set of statuses
    pub fn from_statuses<I: IntoIterator<Item = UpdateStatus>>(statuses: I) -> Self {
        let (mut total, mut completed, mut pending, mut failed) = (0, 0, 0, 0);
        for status in statuses {
            total += 1;
            match status {
                UpdateStatus::Completed => completed += 1,
                UpdateStatus::Failed => failed += 1,
                UpdateStatus::Pending | UpdateStatus::AwaitingVerification => pending += 1,
            }
        }

        let percentage = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };

        Self {
            total,
            completed,
            pending,
            failed,
            percentage,
        }
    }
}

/// Aggregate of every provider outcome for one move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveUpdateReport {
    pub move_id: String,
    pub outcomes: Vec<ServiceOutcome>,
}

impl MoveUpdateReport {
    /// Outcome for a given service
    pub fn outcome(&self, service_id: &str) -> Option<&ServiceOutcome> {
        self.outcomes.iter().find(|o| o.service_id == service_id)
    }

    /// Replace the outcome for a service, or append it
    pub fn upsert(&mut self, outcome: ServiceOutcome) {
        match self
            .outcomes
            .iter_mut()
            .find(|o| o.service_id == outcome.service_id)
        {
            Some(existing) => *existing = outcome,
            None => self.outcomes.push(outcome),
        }
    }

    /// Outcomes that ended in failure
    pub fn failed(&self) -> impl Iterator<Item = &ServiceOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == UpdateStatus::Failed)
    }

    /// Progress counts over all outcomes
    pub fn progress(&self) -> Progress {
        Progress::from_statuses(self.outcomes.iter().map(|o| o.status))
    }

    /// Move status implied by the outcomes
    pub fn move_status(&self) -> MoveStatus {
        if self.outcomes.is_empty() {
            return MoveStatus::Pending;
        }
        if self.outcomes.iter().any(|o| !o.status.is_terminal()) {
            return MoveStatus::InProgress;
        }
        if self
            .outcomes
            .iter()
            .all(|o| o.status == UpdateStatus::Completed)
        {
            MoveStatus::Completed
        } else {
            MoveStatus::Failed
        }
    }
}
