// # Generic Providers
//
// Catalog-driven integrations for providers that need no bespoke code.
//
// - `api`: providers exposing the generic address-change API. Updates are
//   submitted over HTTPS and tracked through the provider's status channel.
// - `manual`: providers the user has to contact themselves. The update
//   returns the provider's change-of-address page and never completes on
//   its own.
//
// ## Catalog
//
// ```json
// [
//   { "type": "api", "id": "octopus", "name": "Octopus Energy",
//     "category": "utilities", "base_url": "https://api.octopus.example/v1" },
//   { "type": "manual", "id": "leeds-council-tax", "name": "Leeds City Council",
//     "category": "council", "instructions_url": "https://www.leeds.gov.uk/council-tax" }
// ]
// ```
//
// ## Security Requirements
//
// - API keys NEVER appear in logs or Debug output
// - Credentials are dropped on cleanup

mod api;
mod manual;

pub use api::{ApiAddressService, DEFAULT_HTTP_TIMEOUT, RemoteChange};
pub use manual::ManualAddressService;

use relocate_core::config::ProviderConfig;
use relocate_core::registry::ServiceRegistry;
use relocate_core::traits::{AddressUpdateService, ServiceFactory};
use relocate_core::{Error, Result};

/// Factory for one catalog entry with an API
pub struct ApiFactory {
    id: String,
    name: String,
    category: String,
    base_url: String,
    client: reqwest::Client,
}

impl ServiceFactory for ApiFactory {
    fn create(&self) -> Box<dyn AddressUpdateService> {
        Box::new(ApiAddressService::new(
            self.id.clone(),
            self.name.clone(),
            self.category.clone(),
            self.base_url.clone(),
            self.client.clone(),
        ))
    }
}

/// Factory for one manual catalog entry
pub struct ManualFactory {
    id: String,
    name: String,
    category: String,
    instructions_url: String,
}

impl ServiceFactory for ManualFactory {
    fn create(&self) -> Box<dyn AddressUpdateService> {
        Box::new(ManualAddressService::new(
            self.id.clone(),
            self.name.clone(),
            self.category.clone(),
            self.instructions_url.clone(),
        ))
    }
}

/// Build the HTTP client shared by every API provider
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))
}

/// Register every catalog entry with the registry
///
/// Entries are validated first; nothing is registered if any entry is
/// invalid.
///
/// # Example
///
/// ```rust,ignore
/// let registry = ServiceRegistry::new();
/// relocate_provider_generic::register_catalog(&registry, &config.providers)?;
/// ```
pub fn register_catalog(registry: &ServiceRegistry, catalog: &[ProviderConfig]) -> Result<()> {
    for entry in catalog {
        entry.validate()?;
    }

    let client = http_client()?;
    for entry in catalog {
        match entry {
            ProviderConfig::Api {
                id,
                name,
                category,
                base_url,
            } => registry.register_service(ApiFactory {
                id: id.clone(),
                name: name.clone(),
                category: category.clone(),
                base_url: base_url.clone(),
                client: client.clone(),
            })?,
            ProviderConfig::Manual {
                id,
                name,
                category,
                instructions_url,
            } => registry.register_service(ManualFactory {
                id: id.clone(),
                name: name.clone(),
                category: category.clone(),
                instructions_url: instructions_url.clone(),
            })?,
        }
    }

    tracing::info!("Registered {} catalog providers", catalog.len());
    Ok(())
}
