//! Service registry
//!
//! The registry maps service ids to [`ServiceFactory`] objects and exposes a
//! uniform facade over every registered integration. The set of providers is
//! closed and enumerable: integrations are registered explicitly at startup,
//! there is no discovery.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relocate_core::registry::ServiceRegistry;
//!
//! let registry = ServiceRegistry::new();
//! relocate_provider_british_gas::register(&registry, engine, &config.automation);
//!
//! // Full cycle: initialize, validate, update, release
//! let result = registry
//!     .update_address("british-gas", &credentials, &old, &new)
//!     .await?;
//! ```
//!
//! ## Attempts
//!
//! Each routing call builds a fresh instance from the factory, so sessions
//! and credentials are never shared between attempts, moves or requests.
//! [`ServiceRegistry::initialize_service`] returns the instance wrapped in a
//! [`ServiceAttempt`] for step-by-step use; the other routing operations run
//! a whole cycle and always release the session before returning.
//!
//! Every routing operation fails with `Error::ServiceNotFound` for an
//! unregistered id before creating anything.

mod attempt;

pub use attempt::ServiceAttempt;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::forms::FormData;
use crate::model::{Address, ServiceCredentials};
use crate::result::ServiceUpdateResult;
use crate::traits::{ServiceDescriptor, ServiceFactory, ensure_required_credentials};

/// Registered integration: its factory plus the descriptor captured at registration
struct Registration {
    factory: Arc<dyn ServiceFactory>,
    descriptor: ServiceDescriptor,
}

/// Registry of provider integrations keyed by service id
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. Locks are never held across an await.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<BTreeMap<String, Registration>>,
}

impl ServiceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an integration factory
    ///
    /// The factory is asked once for the service id and descriptor. A
    /// second registration under the same id replaces the first.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the integration declares no required credentials
    /// or an empty id.
    pub fn register_service(&self, factory: impl ServiceFactory + 'static) -> Result<()> {
        let sample = factory.create();
        let descriptor = sample.descriptor();
        drop(sample);

        if descriptor.id.is_empty() {
            return Err(Error::config("Service id cannot be empty"));
        }
        if descriptor.required_credentials.is_empty() {
            return Err(Error::config(format!(
                "Service {} must declare at least one required credential",
                descriptor.id
            )));
        }

        let mut services = self
            .services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if services.contains_key(&descriptor.id) {
            warn!("Replacing existing registration for {}", descriptor.id);
        }
        info!(
            "Registered service {} ({}, {})",
            descriptor.id, descriptor.name, descriptor.integration_type
        );
        services.insert(
            descriptor.id.clone(),
            Registration {
                factory: Arc::new(factory),
                descriptor,
            },
        );
        Ok(())
    }

    /// Look up a registration, cloning what is needed so no lock outlives the call
    fn lookup(&self, service_id: &str) -> Result<(Arc<dyn ServiceFactory>, ServiceDescriptor)> {
        let services = self
            .services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services
            .get(service_id)
            .map(|r| (Arc::clone(&r.factory), r.descriptor.clone()))
            .ok_or_else(|| Error::service_not_found(service_id))
    }

    /// Create and initialize a fresh integration instance
    ///
    /// Required credential fields are checked before the instance is created,
    /// so a `Error::Validation` never leaves a session behind. If
    /// `initialize` fails the instance is cleaned up before the error is
    /// returned.
    pub async fn initialize_service(
        &self,
        service_id: &str,
        credentials: &ServiceCredentials,
    ) -> Result<ServiceAttempt> {
        let (factory, descriptor) = self.lookup(service_id)?;

        let required: Vec<&str> = descriptor
            .required_credentials
            .iter()
            .map(String::as_str)
            .collect();
        let missing = credentials.missing(&required);
        if !missing.is_empty() {
            return Err(Error::validation(service_id, missing));
        }

        let mut service = factory.create();
        let credentials = ensure_required_credentials(service.as_ref(), credentials)?;

        debug!("Initializing {}", service_id);
        if let Err(e) = service.initialize(&credentials).await {
            warn!("Initialization of {} failed: {}", service_id, e);
            service.cleanup().await;
            return Err(e);
        }

        Ok(ServiceAttempt::new(service))
    }

    /// Check credentials against the provider (full cycle)
    pub async fn validate_service_credentials(
        &self,
        service_id: &str,
        credentials: &ServiceCredentials,
    ) -> Result<bool> {
        let mut attempt = self.initialize_service(service_id, credentials).await?;
        let valid = attempt.validate_credentials().await;
        attempt.release().await;
        valid
    }

    /// Perform an address update (full cycle)
    ///
    /// Initializes, validates credentials, updates and releases the session
    /// on every exit path.
    ///
    /// # Errors
    ///
    /// - `Error::ServiceNotFound`, `Error::Validation`, `Error::Initialization`
    ///   from the initialize step
    /// - `Error::Authentication` if the provider refused the credentials
    /// - `Error::Infrastructure` if the session died mid-call
    pub async fn update_address(
        &self,
        service_id: &str,
        credentials: &ServiceCredentials,
        old_address: &Address,
        new_address: &Address,
    ) -> Result<ServiceUpdateResult> {
        self.lookup(service_id)?;
        new_address.validate()?;

        let mut attempt = self.initialize_service(service_id, credentials).await?;
        let outcome = Self::run_update(&mut attempt, old_address, new_address).await;
        attempt.release().await;

        match &outcome {
            Ok(result) => info!(
                "Update for {} finished: success={}, verification={}",
                service_id, result.success, result.requires_user_verification
            ),
            Err(e) => warn!("Update for {} failed: {}", service_id, e),
        }
        outcome
    }

    async fn run_update(
        attempt: &mut ServiceAttempt,
        old_address: &Address,
        new_address: &Address,
    ) -> Result<ServiceUpdateResult> {
        if !attempt.validate_credentials().await? {
            return Err(Error::auth(format!(
                "{} rejected the supplied credentials",
                attempt.service_id()
            )));
        }
        attempt.update_address(old_address, new_address).await
    }

    /// Poll the status of an earlier update (full cycle)
    pub async fn check_update_status(
        &self,
        service_id: &str,
        credentials: &ServiceCredentials,
        reference: &str,
    ) -> Result<ServiceUpdateResult> {
        let mut attempt = self.initialize_service(service_id, credentials).await?;
        let result = attempt.check_update_status(reference).await;
        attempt.release().await;
        result
    }

    /// Hand a human's verification decision to the integration (full cycle)
    pub async fn confirm_verification(
        &self,
        service_id: &str,
        credentials: &ServiceCredentials,
        data: &FormData,
    ) -> Result<ServiceUpdateResult> {
        let mut attempt = self.initialize_service(service_id, credentials).await?;
        let result = attempt.handle_user_verification(data).await;
        attempt.release().await;
        result
    }

    /// Ordered credential fields a service needs
    pub fn get_required_credentials(&self, service_id: &str) -> Result<Vec<String>> {
        self.lookup(service_id)
            .map(|(_, descriptor)| descriptor.required_credentials)
    }

    /// Descriptor listing for every registered service, ordered by id
    pub fn get_available_services(&self) -> Vec<ServiceDescriptor> {
        let services = self
            .services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services.values().map(|r| r.descriptor.clone()).collect()
    }

    /// Descriptor for one service
    pub fn descriptor(&self, service_id: &str) -> Result<ServiceDescriptor> {
        self.lookup(service_id).map(|(_, descriptor)| descriptor)
    }

    /// List all registered service ids
    pub fn list_services(&self) -> Vec<String> {
        let services = self
            .services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services.keys().cloned().collect()
    }

    /// Check if a service id is registered
    pub fn has_service(&self, service_id: &str) -> bool {
        let services = self
            .services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services.contains_key(service_id)
    }
}
