// # Address Update Service Trait
//
// Defines the capability contract every provider integration implements,
// whatever its mechanism: a native API, browser-driven form automation, or
// a fully manual hand-off.
//
// ## Implementations
//
// - British Gas (form automation): `relocate-provider-british-gas` crate
// - Generic API and manual providers: `relocate-provider-generic` crate
//
// ## Usage
//
// ```rust,ignore
// use relocate_core::{AddressUpdateService, ServiceCredentials};
//
// async fn run(mut service: Box<dyn AddressUpdateService>, creds: ServiceCredentials) -> relocate_core::Result<()> {
//     service.initialize(&creds).await?;
//     if service.validate_credentials().await? {
//         let result = service.update_address(&old, &new).await?;
//         println!("{}", result.message);
//     }
//     service.cleanup().await;
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Address, ServiceCredentials};
use crate::result::ServiceUpdateResult;
use crate::traits::FormAutomation;

/// Mechanism an integration uses to reach its provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationType {
    /// Native provider API
    Api,
    /// Browser-driven form automation
    Rpa,
    /// No automation; the user completes the change themselves
    Manual,
}

impl std::fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IntegrationType::Api => "api",
            IntegrationType::Rpa => "rpa",
            IntegrationType::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Listing entry for one registered provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub id: String,
    pub name: String,
    /// Grouping for display only
    pub category: String,
    pub integration_type: IntegrationType,
    pub required_credentials: Vec<String>,
}

/// Trait for provider integrations
///
/// One instance serves exactly one update attempt. It is created by a
/// [`ServiceFactory`], owned by a single caller, and released through
/// [`cleanup`](AddressUpdateService::cleanup).
///
/// # Error policy
///
/// - Business outcomes (wrong credentials, provider rejected a value) are
///   never errors: `validate_credentials` returns `false` and
///   `update_address` returns a result with `success: false`.
/// - Errors are reserved for conditions that leave the integration unable to
///   reason about provider state: the session could not be created, was
///   never created, or died mid-call.
///
/// All async methods take `&mut self` so implementations only need to be
/// `Send`.
#[async_trait]
pub trait AddressUpdateService: Send {
    /// Unique registry key (e.g. "british-gas")
    fn service_id(&self) -> &str;

    /// Display name
    fn service_name(&self) -> &str;

    /// Display grouping (e.g. "utilities"); not used by core logic
    fn service_category(&self) -> &str;

    /// Mechanism used to reach the provider
    fn integration_type(&self) -> IntegrationType;

    /// Ordered credential fields this integration needs
    ///
    /// Pure: never touches the network. The returned names are exactly the
    /// keys `initialize` keeps from the credential set it is given.
    fn get_required_credentials(&self) -> &'static [&'static str];

    /// Establish the session needed for the attempt
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if a required credential is missing, before any
    ///   network or automation call
    /// - `Error::Initialization` if the session cannot be created
    async fn initialize(&mut self, credentials: &ServiceCredentials) -> Result<()>;

    /// Authenticate against the real provider
    ///
    /// Returns `Ok(false)` for a plain authentication failure; errors only
    /// for infrastructure failure (not initialized, network unreachable).
    async fn validate_credentials(&mut self) -> Result<bool>;

    /// Attempt the provider-specific address change
    async fn update_address(
        &mut self,
        old_address: &Address,
        new_address: &Address,
    ) -> Result<ServiceUpdateResult>;

    /// Idempotent status poll for a reference issued by `update_address`
    async fn check_update_status(&mut self, reference: &str) -> Result<ServiceUpdateResult>;

    /// Release whatever `initialize` acquired
    ///
    /// Must be safe to call more than once, and after a failed `initialize`.
    async fn cleanup(&mut self) {}

    /// Access the form-automation capability, if this integration has it
    fn as_form_automation(&mut self) -> Option<&mut dyn FormAutomation> {
        None
    }

    /// Listing entry for this integration
    fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            id: self.service_id().to_string(),
            name: self.service_name().to_string(),
            category: self.service_category().to_string(),
            integration_type: self.integration_type(),
            required_credentials: self
                .get_required_credentials()
                .iter()
                .map(|field| field.to_string())
                .collect(),
        }
    }
}

/// Check a credential set against a service's required fields
///
/// Returns a copy restricted to exactly the required fields, or
/// `Error::Validation` naming every missing one.
pub fn ensure_required_credentials(
    service: &dyn AddressUpdateService,
    credentials: &ServiceCredentials,
) -> Result<ServiceCredentials> {
    let required = service.get_required_credentials();
    let missing = credentials.missing(required);
    if !missing.is_empty() {
        return Err(Error::validation(service.service_id(), missing));
    }
    Ok(credentials.restricted_to(required))
}

/// Helper trait for constructing integrations
///
/// The registry keeps factories rather than instances so that every attempt
/// starts from a clean instance with no session or credentials carried over.
pub trait ServiceFactory: Send + Sync {
    /// Create a fresh, uninitialized integration instance
    ///
    /// Must not perform I/O; session acquisition belongs in `initialize`.
    fn create(&self) -> Box<dyn AddressUpdateService>;
}

impl<F> ServiceFactory for F
where
    F: Fn() -> Box<dyn AddressUpdateService> + Send + Sync,
{
    fn create(&self) -> Box<dyn AddressUpdateService> {
        self()
    }
}
