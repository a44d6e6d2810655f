//! Providers without automation.

use async_trait::async_trait;
use relocate_core::error::{Error, Result};
use relocate_core::model::{Address, ServiceCredentials};
use relocate_core::result::ServiceUpdateResult;
use relocate_core::traits::{AddressUpdateService, IntegrationType, ensure_required_credentials};
use tracing::debug;

/// Integration that routes the user to the provider's own change-of-address page
#[derive(Debug)]
pub struct ManualAddressService {
    id: String,
    name: String,
    category: String,
    instructions_url: String,
    account_number: Option<String>,
}

impl ManualAddressService {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        instructions_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            instructions_url: instructions_url.into(),
            account_number: None,
        }
    }

    fn account_number(&self) -> Result<&str> {
        self.account_number
            .as_deref()
            .ok_or_else(|| Error::infrastructure(format!("{} is not initialized", self.id)))
    }

    fn instructions(&self, new_address: &Address) -> Result<String> {
        Ok(format!(
            "Update your address with {} at {} quoting account number {}. New address: {}",
            self.name,
            self.instructions_url,
            self.account_number()?,
            new_address.one_line()
        ))
    }
}

#[async_trait]
impl AddressUpdateService for ManualAddressService {
    fn service_id(&self) -> &str {
        &self.id
    }

    fn service_name(&self) -> &str {
        &self.name
    }

    fn service_category(&self) -> &str {
        &self.category
    }

    fn integration_type(&self) -> IntegrationType {
        IntegrationType::Manual
    }

    fn get_required_credentials(&self) -> &'static [&'static str] {
        &["accountNumber"]
    }

    async fn initialize(&mut self, credentials: &ServiceCredentials) -> Result<()> {
        let credentials = ensure_required_credentials(&*self, credentials)?;
        self.account_number = credentials.get("accountNumber").map(str::to_string);
        Ok(())
    }

    // Nothing to check without a provider API
    async fn validate_credentials(&mut self) -> Result<bool> {
        self.account_number()?;
        Ok(true)
    }

    async fn update_address(
        &mut self,
        _old_address: &Address,
        new_address: &Address,
    ) -> Result<ServiceUpdateResult> {
        let message = self.instructions(new_address)?;
        let reference = format!("{}-manual-{}", self.id, uuid::Uuid::new_v4().simple());
        debug!("{} needs a manual update ({})", self.id, reference);

        Ok(ServiceUpdateResult::awaiting_verification(message)
            .with_reference(reference)
            .with_verification_url(self.instructions_url.clone()))
    }

    async fn check_update_status(&mut self, reference: &str) -> Result<ServiceUpdateResult> {
        Ok(ServiceUpdateResult::awaiting_verification(format!(
            "Waiting for you to confirm the update with {}",
            self.name
        ))
        .with_reference(reference)
        .with_verification_url(self.instructions_url.clone()))
    }

    async fn cleanup(&mut self) {
        self.account_number = None;
    }
}
