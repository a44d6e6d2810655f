//! Test doubles and common utilities for contract tests
//!
//! This module provides scripted integrations that count every lifecycle
//! call without talking to any real provider.

#![allow(dead_code)]

use async_trait::async_trait;
use relocate_core::error::{Error, Result};
use relocate_core::model::{Address, ServiceCredentials};
use relocate_core::result::ServiceUpdateResult;
use relocate_core::traits::{AddressUpdateService, IntegrationType, ServiceFactory};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How `update_address` answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateBehavior {
    Succeed,
    AwaitVerification,
    Pending,
    Reject,
    Infrastructure,
    Panic,
}

/// How one `check_update_status` call answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAnswer {
    Pending,
    AwaitVerification,
    Completed,
    Rejected,
    Transient,
}

/// Shared call counters, cloned into every instance a factory creates
#[derive(Debug, Clone, Default)]
pub struct CallCounters {
    created: Arc<AtomicUsize>,
    initialize: Arc<AtomicUsize>,
    validate: Arc<AtomicUsize>,
    update: Arc<AtomicUsize>,
    status: Arc<AtomicUsize>,
    cleanup: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl CallCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances created, including the sample made at registration
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn initialize(&self) -> usize {
        self.initialize.load(Ordering::SeqCst)
    }

    pub fn validate(&self) -> usize {
        self.validate.load(Ordering::SeqCst)
    }

    pub fn update(&self) -> usize {
        self.update.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> usize {
        self.status.load(Ordering::SeqCst)
    }

    /// Calls to `cleanup`, effective or not
    pub fn cleanup(&self) -> usize {
        self.cleanup.load(Ordering::SeqCst)
    }

    /// Sessions actually torn down
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// Behaviour of a mock integration
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub fail_initialize: bool,
    pub valid_credentials: bool,
    pub update: UpdateBehavior,
    /// Delay before `update_address` answers
    pub update_delay: Duration,
    /// Answers for successive status checks; the last one repeats
    pub status_script: Arc<Mutex<VecDeque<StatusAnswer>>>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            fail_initialize: false,
            valid_credentials: true,
            update: UpdateBehavior::Succeed,
            update_delay: Duration::ZERO,
            status_script: Arc::new(Mutex::new(VecDeque::from([StatusAnswer::Completed]))),
        }
    }
}

impl MockBehavior {
    pub fn updating(update: UpdateBehavior) -> Self {
        Self {
            update,
            ..Self::default()
        }
    }

    pub fn with_status_script(self, answers: impl IntoIterator<Item = StatusAnswer>) -> Self {
        Self {
            status_script: Arc::new(Mutex::new(answers.into_iter().collect())),
            ..self
        }
    }

    fn next_status(&self) -> StatusAnswer {
        let mut script = self.status_script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().copied().unwrap_or(StatusAnswer::Pending)
        }
    }
}

/// Scripted integration requiring `username` and `password`
pub struct MockService {
    id: &'static str,
    behavior: MockBehavior,
    counters: CallCounters,
    initialized: bool,
    released: bool,
}

impl MockService {
    pub fn new(id: &'static str, behavior: MockBehavior, counters: CallCounters) -> Self {
        counters.created.fetch_add(1, Ordering::SeqCst);
        Self {
            id,
            behavior,
            counters,
            initialized: false,
            released: false,
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.initialized || self.released {
            return Err(Error::infrastructure(format!("{} has no session", self.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AddressUpdateService for MockService {
    fn service_id(&self) -> &str {
        self.id
    }

    fn service_name(&self) -> &str {
        "Mock Provider"
    }

    fn service_category(&self) -> &str {
        "testing"
    }

    fn integration_type(&self) -> IntegrationType {
        IntegrationType::Api
    }

    fn get_required_credentials(&self) -> &'static [&'static str] {
        &["username", "password"]
    }

    async fn initialize(&mut self, _credentials: &ServiceCredentials) -> Result<()> {
        self.counters.initialize.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_initialize {
            return Err(Error::initialization("mock session refused"));
        }
        self.initialized = true;
        Ok(())
    }

    async fn validate_credentials(&mut self) -> Result<bool> {
        self.counters.validate.fetch_add(1, Ordering::SeqCst);
        self.ensure_ready()?;
        Ok(self.behavior.valid_credentials)
    }

    async fn update_address(
        &mut self,
        _old_address: &Address,
        new_address: &Address,
    ) -> Result<ServiceUpdateResult> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        self.ensure_ready()?;

        if !self.behavior.update_delay.is_zero() {
            tokio::time::sleep(self.behavior.update_delay).await;
        }

        let reference = format!("{}-ref", self.id);
        match self.behavior.update {
            UpdateBehavior::Succeed => Ok(ServiceUpdateResult::succeeded(format!(
                "Moved to {}",
                new_address.postcode
            ))
            .with_reference(reference)),
            UpdateBehavior::AwaitVerification => Ok(ServiceUpdateResult::awaiting_verification(
                "Please confirm",
            )
            .with_verification_url("https://mock.test/verify")
            .with_reference(reference)),
            UpdateBehavior::Pending => {
                Ok(ServiceUpdateResult::pending("Queued").with_reference(reference))
            }
            UpdateBehavior::Reject => Ok(ServiceUpdateResult::failed("Postcode not served")
                .with_error("unsupported postcode")),
            UpdateBehavior::Infrastructure => Err(Error::infrastructure("mock session died")),
            UpdateBehavior::Panic => panic!("mock integration panicked"),
        }
    }

    async fn check_update_status(&mut self, reference: &str) -> Result<ServiceUpdateResult> {
        self.counters.status.fetch_add(1, Ordering::SeqCst);
        self.ensure_ready()?;

        let result = match self.behavior.next_status() {
            StatusAnswer::Pending => ServiceUpdateResult::pending("Still processing"),
            StatusAnswer::AwaitVerification => {
                ServiceUpdateResult::awaiting_verification("Check your email")
            }
            StatusAnswer::Completed => ServiceUpdateResult::succeeded("Done"),
            StatusAnswer::Rejected => ServiceUpdateResult::failed("Rejected by provider"),
            StatusAnswer::Transient => return Err(Error::infrastructure("status endpoint down")),
        };
        Ok(result.with_reference(reference))
    }

    async fn cleanup(&mut self) {
        self.counters.cleanup.fetch_add(1, Ordering::SeqCst);
        if self.initialized && !self.released {
            self.released = true;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Factory producing [`MockService`] instances that share `counters`
pub fn mock_factory(
    id: &'static str,
    behavior: MockBehavior,
    counters: &CallCounters,
) -> impl ServiceFactory + 'static {
    let counters = counters.clone();
    move || -> Box<dyn AddressUpdateService> {
        Box::new(MockService::new(id, behavior.clone(), counters.clone()))
    }
}

pub fn credentials() -> ServiceCredentials {
    ServiceCredentials::new()
        .with("username", "jane@example.com")
        .with("password", "hunter2")
}

pub fn old_address() -> Address {
    Address::new("1 Old Lane", "York", "YO1 7HH")
}

pub fn new_address() -> Address {
    Address::new("22 New Road", "Leeds", "LS1 4AP").with_county("West Yorkshire")
}
