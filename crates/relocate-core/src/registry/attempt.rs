// # Service Attempt
//
// Scoped ownership of one integration instance for one update attempt.
//
// ## Lifecycle
//
// 1. Created by `ServiceRegistry::initialize_service` after `initialize`
//    succeeded
// 2. Used for validate / update / status / verification calls
// 3. Released with `release()`, which calls `cleanup()` exactly once
//
// Dropping an attempt that was never released schedules the cleanup on the
// current Tokio runtime so the session is still torn down on panics and
// early returns.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::forms::FormData;
use crate::model::Address;
use crate::result::ServiceUpdateResult;
use crate::traits::AddressUpdateService;

/// Exclusive handle on an initialized integration instance
pub struct ServiceAttempt {
    service_id: String,
    service: Option<Box<dyn AddressUpdateService>>,
}

impl std::fmt::Debug for ServiceAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAttempt")
            .field("service_id", &self.service_id)
            .field("released", &self.service.is_none())
            .finish()
    }
}

impl ServiceAttempt {
    pub(crate) fn new(service: Box<dyn AddressUpdateService>) -> Self {
        Self {
            service_id: service.service_id().to_string(),
            service: Some(service),
        }
    }

    /// Service this attempt belongs to
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Whether `release()` already ran
    pub fn is_released(&self) -> bool {
        self.service.is_none()
    }

    fn service(&mut self) -> Result<&mut Box<dyn AddressUpdateService>> {
        let service_id = &self.service_id;
        self.service.as_mut().ok_or_else(|| {
            Error::infrastructure(format!("Attempt for {} was already released", service_id))
        })
    }

    /// See [`AddressUpdateService::validate_credentials`]
    pub async fn validate_credentials(&mut self) -> Result<bool> {
        self.service()?.validate_credentials().await
    }

    /// See [`AddressUpdateService::update_address`]
    pub async fn update_address(
        &mut self,
        old_address: &Address,
        new_address: &Address,
    ) -> Result<ServiceUpdateResult> {
        self.service()?
            .update_address(old_address, new_address)
            .await
    }

    /// See [`AddressUpdateService::check_update_status`]
    pub async fn check_update_status(&mut self, reference: &str) -> Result<ServiceUpdateResult> {
        self.service()?.check_update_status(reference).await
    }

    /// Route a human's verification decision to the form-automation capability
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` if the integration has no form-automation capability.
    pub async fn handle_user_verification(
        &mut self,
        data: &FormData,
    ) -> Result<ServiceUpdateResult> {
        let service_id = self.service_id.clone();
        let automation = self.service()?.as_form_automation().ok_or_else(|| {
            Error::invalid_input(format!(
                "Service {} does not support verification hand-off",
                service_id
            ))
        })?;
        automation.handle_user_verification(data).await
    }

    /// Direct access to the integration for capability-specific calls
    pub fn service_mut(&mut self) -> Option<&mut (dyn AddressUpdateService + 'static)> {
        self.service.as_deref_mut()
    }

    /// Release the session; later calls are no-ops
    pub async fn release(&mut self) {
        if let Some(mut service) = self.service.take() {
            service.cleanup().await;
            debug!("Released attempt for {}", self.service_id);
        }
    }
}

impl Drop for ServiceAttempt {
    fn drop(&mut self) {
        let Some(mut service) = self.service.take() else {
            return;
        };

        warn!(
            "Attempt for {} dropped without release, scheduling cleanup",
            self.service_id
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    service.cleanup().await;
                });
            }
            Err(_) => {
                warn!(
                    "No runtime available to clean up attempt for {}",
                    self.service_id
                );
            }
        }
    }
}
