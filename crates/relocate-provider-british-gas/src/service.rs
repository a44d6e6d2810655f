//! British Gas integration instance.

use async_trait::async_trait;
use relocate_core::error::{Error, Result};
use relocate_core::forms::{FormData, FormDescriptor, FormField, ServiceWebForm, address_form_data};
use relocate_core::model::{Address, ServiceCredentials};
use relocate_core::result::ServiceUpdateResult;
use relocate_core::traits::{
    AddressUpdateService, BrowserEngine, BrowserSession, FormAutomation, IntegrationType,
    LaunchOptions, ensure_required_credentials,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::form;

/// Where an attempt stands
///
/// ```text
/// Uninitialized → SessionActive → LoggedIn → FormFilled → AwaitingUserVerification → Confirmed
///                              ↘ LoginFailed                                     ↘ Abandoned
/// any state → Released (cleanup)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Uninitialized,
    SessionActive,
    LoggedIn,
    LoginFailed,
    FormFilled,
    AwaitingUserVerification,
    Confirmed,
    Abandoned,
    Released,
}

/// Screenshot location on disk and as served to users
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    pub dir: PathBuf,
    pub url_prefix: String,
}

impl ScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }

    /// Write a PNG and return its public URL
    async fn save(&self, png: &[u8]) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let filename = format!(
            "british-gas-form-{}-{}.png",
            chrono::Utc::now().timestamp_millis(),
            &id[..8]
        );

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&filename), png).await?;

        Ok(format!(
            "{}/{}",
            self.url_prefix.trim_end_matches('/'),
            filename
        ))
    }
}

/// British Gas form-automation integration
///
/// One instance drives one browser session for one update attempt.
pub struct BritishGasService {
    engine: Arc<dyn BrowserEngine>,
    options: LaunchOptions,
    screenshots: ScreenshotStore,
    credentials: Option<ServiceCredentials>,
    session: Option<Box<dyn BrowserSession>>,
    state: AttemptState,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for BritishGasService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BritishGasService")
            .field("engine", &self.engine.engine_name())
            .field("credentials", &self.credentials.as_ref().map(|_| "<REDACTED>"))
            .field("has_session", &self.session.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl BritishGasService {
    pub const SERVICE_ID: &'static str = "british-gas";

    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        options: LaunchOptions,
        screenshots: ScreenshotStore,
    ) -> Self {
        Self {
            engine,
            options,
            screenshots,
            credentials: None,
            session: None,
            state: AttemptState::Uninitialized,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    fn session(&mut self) -> Result<&mut Box<dyn BrowserSession>> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::infrastructure("British Gas session is not initialized"))
    }

    fn credential(&self, name: &str) -> Result<String> {
        self.credentials
            .as_ref()
            .and_then(|c| c.get(name))
            .map(str::to_string)
            .ok_or_else(|| Error::infrastructure("British Gas session is not initialized"))
    }

    /// Sign in through the login form
    async fn login(&mut self) -> Result<bool> {
        let mut data = FormData::new();
        data.insert("username".to_string(), self.credential("accountNumber")?);
        data.insert("password".to_string(), self.credential("password")?);

        let login_form = form::login_form();
        let session = self.session()?;
        session.goto(&login_form.url).await?;
        self.fill_form(&login_form, &data).await?;

        let session = self.session()?;
        session.click(&login_form.submit_locator).await?;
        session.wait_for_navigation().await?;
        let landed = session.current_url().await?;

        debug!("British Gas login landed on {}", landed);
        Ok(landed.contains(form::LOGGED_IN_PATH))
    }

    /// Navigate to the address page and fill it
    async fn draft_address(&mut self, new_address: &Address) -> Result<()> {
        let address_form = form::address_form();
        self.session()?.goto(&address_form.url).await?;
        self.fill_form(&address_form, &address_form_data(new_address))
            .await?;
        self.state = AttemptState::FormFilled;
        Ok(())
    }

    /// Screenshot for a failed draft; a failure here must not mask the original error
    async fn best_effort_screenshot(&mut self) -> Option<String> {
        match self.capture_form_screenshot().await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Could not capture British Gas screenshot: {}", e);
                None
            }
        }
    }

    async fn submit_draft(&mut self) -> Result<ServiceUpdateResult> {
        let session = self.session()?;
        match session.click(form::ADDRESS_SUBMIT).await {
            Ok(()) => {}
            Err(e) if e.is_page_level() => {
                return Ok(ServiceUpdateResult::failed("Could not submit the address form")
                    .with_error(e));
            }
            Err(e) => return Err(e),
        }
        session.wait_for_navigation().await?;

        self.state = AttemptState::Confirmed;
        info!("British Gas address change submitted after user confirmation");
        Ok(ServiceUpdateResult::succeeded(
            "Address update submitted successfully",
        ))
    }
}

fn flag(data: &FormData, name: &str) -> bool {
    data.get(name)
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

#[async_trait]
impl AddressUpdateService for BritishGasService {
    fn service_id(&self) -> &str {
        Self::SERVICE_ID
    }

    fn service_name(&self) -> &str {
        "British Gas"
    }

    fn service_category(&self) -> &str {
        "utilities"
    }

    fn integration_type(&self) -> IntegrationType {
        IntegrationType::Rpa
    }

    fn get_required_credentials(&self) -> &'static [&'static str] {
        &["accountNumber", "password"]
    }

    async fn initialize(&mut self, credentials: &ServiceCredentials) -> Result<()> {
        let credentials = ensure_required_credentials(&*self, credentials)?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::initialization(
                "British Gas automation needs a Tokio runtime",
            ));
        }

        if self.session.is_some() {
            debug!("Re-initializing British Gas attempt, closing previous session");
            self.cleanup().await;
        }

        let session = self.engine.launch(&self.options).await.map_err(|e| {
            if matches!(e, Error::Initialization(_)) {
                e
            } else {
                Error::initialization(format!("Failed to start browser session: {}", e))
            }
        })?;

        self.session = Some(session);
        self.credentials = Some(credentials);
        self.state = AttemptState::SessionActive;
        debug!("British Gas session started on {}", self.engine.engine_name());
        Ok(())
    }

    async fn validate_credentials(&mut self) -> Result<bool> {
        self.session()?;

        match self.state {
            AttemptState::LoginFailed => return Ok(false),
            AttemptState::LoggedIn
            | AttemptState::FormFilled
            | AttemptState::AwaitingUserVerification
            | AttemptState::Confirmed => return Ok(true),
            _ => {}
        }

        let logged_in = match self.login().await {
            Ok(logged_in) => logged_in,
            Err(e) if e.is_page_level() => {
                warn!("British Gas login page did not behave as expected: {}", e);
                false
            }
            Err(e) => return Err(e),
        };

        self.state = if logged_in {
            AttemptState::LoggedIn
        } else {
            AttemptState::LoginFailed
        };
        Ok(logged_in)
    }

    async fn update_address(
        &mut self,
        _old_address: &Address,
        new_address: &Address,
    ) -> Result<ServiceUpdateResult> {
        self.session()?;
        if self.state != AttemptState::LoggedIn {
            return Ok(ServiceUpdateResult::failed(
                "Sign in with validate_credentials before updating the address",
            ));
        }

        if let Err(e) = self.draft_address(new_address).await {
            if !e.is_page_level() {
                return Err(e);
            }
            warn!("British Gas address form could not be filled: {}", e);
            let mut result =
                ServiceUpdateResult::failed("Failed to fill address form").with_error(e);
            if let Some(url) = self.best_effort_screenshot().await {
                result = result.with_screenshot(url);
            }
            return Ok(result);
        }

        let screenshot_url = self.capture_form_screenshot().await?;
        let verification_url = self.get_current_url().await?;
        self.state = AttemptState::AwaitingUserVerification;

        let reference = format!(
            "{}-{}",
            Self::SERVICE_ID,
            uuid::Uuid::new_v4().simple()
        );
        info!("British Gas address form drafted ({})", reference);

        Ok(
            ServiceUpdateResult::awaiting_verification(
                "Address form filled. Please verify and submit.",
            )
            .with_reference(reference)
            .with_screenshot(screenshot_url)
            .with_verification_url(verification_url),
        )
    }

    async fn check_update_status(&mut self, reference: &str) -> Result<ServiceUpdateResult> {
        // No server-side status channel; completion is confirmed by email.
        Ok(
            ServiceUpdateResult::awaiting_verification("Please check your email for confirmation")
                .with_reference(reference)
                .with_verification_url(form::ADDRESS_URL),
        )
    }

    async fn cleanup(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!("Error closing British Gas session: {}", e);
            }
            debug!("British Gas session released");
        }
        self.credentials = None;
        if self.state != AttemptState::Uninitialized {
            self.state = AttemptState::Released;
        }
    }

    fn as_form_automation(&mut self) -> Option<&mut dyn FormAutomation> {
        Some(self)
    }
}

#[async_trait]
impl FormAutomation for BritishGasService {
    fn get_web_form(&self) -> ServiceWebForm {
        form::web_form()
    }

    async fn analyze_form_structure(&mut self, url: &str) -> Result<Vec<FormField>> {
        let session = self.session()?;
        let inspected = match session.goto(url).await {
            Ok(()) => session.inspect_inputs().await,
            Err(e) => Err(e),
        };

        match inspected {
            Ok(fields) => Ok(fields),
            Err(e) if e.is_page_level() => {
                warn!("Could not analyze form at {}: {}", url, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn fill_form(&mut self, form: &FormDescriptor, data: &FormData) -> Result<usize> {
        let session = self.session()?;
        let mut filled = 0;
        for (field, value) in form.fill_plan(data) {
            if value.is_empty() {
                continue;
            }
            session.fill(&field.locator, value).await?;
            filled += 1;
        }
        Ok(filled)
    }

    async fn capture_form_screenshot(&mut self) -> Result<String> {
        let png = self.session()?.screenshot().await?;
        let url = self.screenshots.save(&png).await?;
        debug!("British Gas screenshot saved as {}", url);
        Ok(url)
    }

    async fn handle_user_verification(&mut self, data: &FormData) -> Result<ServiceUpdateResult> {
        if flag(data, "submitted") {
            self.state = AttemptState::Confirmed;
            return Ok(ServiceUpdateResult::succeeded(
                "Address update submitted by the account holder",
            ));
        }

        if !flag(data, "confirmed") {
            self.state = AttemptState::Abandoned;
            return Ok(ServiceUpdateResult::failed(
                "Address update abandoned by the account holder",
            ));
        }

        if self.state == AttemptState::AwaitingUserVerification {
            return self.submit_draft().await;
        }

        // Confirmation reached a fresh attempt: redraft from the supplied address first.
        let Some(address) = address_from_form_data(data) else {
            return Ok(ServiceUpdateResult::failed(
                "No drafted form in this session and no address supplied to redraft it",
            ));
        };
        if !self.validate_credentials().await? {
            return Ok(ServiceUpdateResult::failed("British Gas rejected the credentials"));
        }
        if let Err(e) = self.draft_address(&address).await {
            if !e.is_page_level() {
                return Err(e);
            }
            return Ok(ServiceUpdateResult::failed("Failed to fill address form").with_error(e));
        }
        self.state = AttemptState::AwaitingUserVerification;
        self.submit_draft().await
    }

    async fn get_current_url(&mut self) -> Result<String> {
        self.session()?.current_url().await
    }
}

/// Rebuild an address from verification form data (`line1`, `town`, `postcode` required)
fn address_from_form_data(data: &FormData) -> Option<Address> {
    let get = |key: &str| data.get(key).filter(|v| !v.trim().is_empty()).cloned();

    let mut address = Address::new(get("line1")?, get("town")?, get("postcode")?);
    if let Some(line2) = get("line2") {
        address = address.with_line2(line2);
    }
    if let Some(county) = get("county") {
        address = address.with_county(county);
    }
    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_case_insensitive() {
        let mut data = FormData::new();
        data.insert("confirmed".into(), "TRUE".into());
        assert!(flag(&data, "confirmed"));
        assert!(!flag(&data, "submitted"));
    }

    #[test]
    fn test_address_from_form_data_requires_core_parts() {
        let mut data = FormData::new();
        data.insert("line1".into(), "22 New Road".into());
        data.insert("town".into(), "Leeds".into());
        assert!(address_from_form_data(&data).is_none());

        data.insert("postcode".into(), "LS1 4AP".into());
        data.insert("county".into(), "West Yorkshire".into());
        let address = address_from_form_data(&data).unwrap();
        assert_eq!(address.county.as_deref(), Some("West Yorkshire"));
        assert!(address.line2.is_none());
    }
}
