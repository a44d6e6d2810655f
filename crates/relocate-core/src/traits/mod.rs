//! Core traits for the relocate system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressUpdateService`]: Capability contract of every provider integration
//! - [`FormAutomation`]: Browser-driven extension of the service contract
//! - [`BrowserEngine`] / [`BrowserSession`]: Automation seam used by form integrations
//! - [`ServiceFactory`]: Creates one fresh integration instance per update attempt

pub mod update_service;
pub mod form_automation;
pub mod browser;

pub use update_service::{
    AddressUpdateService, IntegrationType, ServiceDescriptor, ServiceFactory,
    ensure_required_credentials,
};
pub use form_automation::FormAutomation;
pub use browser::{BrowserEngine, BrowserSession, LaunchOptions, Viewport};
