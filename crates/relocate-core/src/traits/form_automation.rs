// # Form Automation Trait
//
// Browser-driven (RPA) extension of `AddressUpdateService`.
//
// Automated form filling against third-party sites is treated as a draft the
// system prepares: fields are filled, a screenshot is captured, and the
// submit control is left alone until a human confirms through
// `handle_user_verification`.

use async_trait::async_trait;

use crate::error::Result;
use crate::forms::{FormData, FormDescriptor, FormField, ServiceWebForm};
use crate::result::ServiceUpdateResult;
use crate::traits::AddressUpdateService;

/// Trait for browser-driven integrations
///
/// Session teardown is [`AddressUpdateService::cleanup`], which every
/// implementation of this trait must override.
#[async_trait]
pub trait FormAutomation: AddressUpdateService {
    /// Declared login and address forms
    fn get_web_form(&self) -> ServiceWebForm;

    /// Propose a field list for a live page
    ///
    /// Used to detect drift against [`get_web_form`](FormAutomation::get_web_form);
    /// never authoritative.
    async fn analyze_form_structure(&mut self, url: &str) -> Result<Vec<FormField>>;

    /// Write `data` into the declared fields of `form`
    ///
    /// Fields whose name has no entry in `data` are skipped. Never clicks
    /// the submit control. Returns the number of fields written.
    async fn fill_form(&mut self, form: &FormDescriptor, data: &FormData) -> Result<usize>;

    /// Persist an image of the current page and return its public location
    async fn capture_form_screenshot(&mut self) -> Result<String>;

    /// Finalize an update after a human has reviewed the filled form
    async fn handle_user_verification(&mut self, data: &FormData) -> Result<ServiceUpdateResult>;

    /// URL of the page the session is on
    async fn get_current_url(&mut self) -> Result<String>;
}
