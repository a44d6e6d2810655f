// # British Gas Provider
//
// Form-automation integration for British Gas customer accounts.
//
// ## Flow
//
// 1. `initialize` opens a browser session through the configured engine
// 2. `validate_credentials` signs in at the identity page; success is
//    observed when the browser lands under `/account/`
// 3. `update_address` fills the personal-details form, captures a
//    screenshot and stops before submitting
// 4. The account holder reviews the draft; `handle_user_verification`
//    submits it (`confirmed=true`), records their own submission
//    (`submitted=true`) or abandons it
//
// British Gas has no status API. `check_update_status` always reports that
// the change awaits confirmation by email.
//
// ## Security Requirements
//
// - Account number and password NEVER appear in logs
// - Credentials are dropped on cleanup together with the session

mod form;
mod service;

pub use form::{ADDRESS_URL, BASE_URL, LOGIN_URL};
pub use service::{AttemptState, BritishGasService, ScreenshotStore};

use relocate_core::config::AutomationConfig;
use relocate_core::registry::ServiceRegistry;
use relocate_core::traits::{AddressUpdateService, BrowserEngine, LaunchOptions, ServiceFactory};
use std::sync::Arc;

/// Desktop user agent used when none is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Factory for British Gas integration instances
///
/// Every instance shares the engine but opens its own session.
pub struct BritishGasFactory {
    engine: Arc<dyn BrowserEngine>,
    options: LaunchOptions,
    screenshots: ScreenshotStore,
}

impl BritishGasFactory {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        options: LaunchOptions,
        screenshots: ScreenshotStore,
    ) -> Self {
        Self {
            engine,
            options,
            screenshots,
        }
    }

    /// Factory configured from the automation settings
    pub fn from_config(engine: Arc<dyn BrowserEngine>, config: &AutomationConfig) -> Self {
        let mut options = config.launch_options();
        if options.user_agent.is_none() {
            options.user_agent = Some(DEFAULT_USER_AGENT.to_string());
        }

        Self::new(
            engine,
            options,
            ScreenshotStore::new(&config.screenshot_dir, &config.screenshot_url_prefix),
        )
    }
}

impl ServiceFactory for BritishGasFactory {
    fn create(&self) -> Box<dyn AddressUpdateService> {
        Box::new(BritishGasService::new(
            Arc::clone(&self.engine),
            self.options.clone(),
            self.screenshots.clone(),
        ))
    }
}

/// Register the British Gas integration with the registry
///
/// # Example
///
/// ```rust,ignore
/// use relocate_core::registry::ServiceRegistry;
///
/// let registry = ServiceRegistry::new();
/// relocate_provider_british_gas::register(&registry, engine, &config.automation)?;
/// ```
pub fn register(
    registry: &ServiceRegistry,
    engine: Arc<dyn BrowserEngine>,
    config: &AutomationConfig,
) -> relocate_core::Result<()> {
    registry.register_service(BritishGasFactory::from_config(engine, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relocate_core::traits::{BrowserSession, IntegrationType};
    use relocate_core::{Error, Result};

    struct NoBrowser;

    #[async_trait]
    impl BrowserEngine for NoBrowser {
        async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
            Err(Error::initialization("no browser in unit tests"))
        }

        fn engine_name(&self) -> &'static str {
            "none"
        }
    }

    #[test]
    fn test_factory_applies_default_user_agent() {
        let factory = BritishGasFactory::from_config(Arc::new(NoBrowser), &AutomationConfig::default());
        assert_eq!(factory.options.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
        assert_eq!(factory.screenshots.url_prefix, "/screenshots");
    }

    #[test]
    fn test_register_describes_service() {
        let registry = ServiceRegistry::new();
        register(&registry, Arc::new(NoBrowser), &AutomationConfig::default()).unwrap();

        let descriptor = registry.descriptor("british-gas").unwrap();
        assert_eq!(descriptor.name, "British Gas");
        assert_eq!(descriptor.category, "utilities");
        assert_eq!(descriptor.integration_type, IntegrationType::Rpa);
        assert_eq!(descriptor.required_credentials, ["accountNumber", "password"]);
    }

    #[test]
    fn test_factory_creates_fresh_uninitialized_instances() {
        let factory = BritishGasFactory::from_config(Arc::new(NoBrowser), &AutomationConfig::default());
        let first = factory.create();
        let second = factory.create();
        assert_eq!(first.service_id(), BritishGasService::SERVICE_ID);
        assert_eq!(first.descriptor(), second.descriptor());
    }
}
