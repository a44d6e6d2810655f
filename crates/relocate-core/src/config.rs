//! Configuration types for the relocate system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::traits::{LaunchOptions, Viewport};

/// Main relocate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelocateConfig {
    /// Browser automation settings
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Status polling settings
    #[serde(default)]
    pub polling: PollingConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Catalog of generic API and manual providers
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl RelocateConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.automation.validate()?;
        self.polling.validate()?;
        self.engine.validate()?;

        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !seen.insert(provider.id()) {
                return Err(crate::Error::config(format!(
                    "Duplicate provider id in catalog: {}",
                    provider.id()
                )));
            }
        }

        Ok(())
    }
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Chrome DevTools endpoint (e.g., "http://127.0.0.1:9222")
    #[serde(default = "default_cdp_endpoint")]
    pub cdp_endpoint: String,

    /// Run pages headless
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Viewport for new pages
    #[serde(default)]
    pub viewport: Viewport,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Navigation timeout (in seconds)
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Directory screenshots are written to
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    /// Public URL prefix under which `screenshot_dir` is served
    #[serde(default = "default_screenshot_url_prefix")]
    pub screenshot_url_prefix: String,
}

impl AutomationConfig {
    /// Validate the automation configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.cdp_endpoint.starts_with("http://") && !self.cdp_endpoint.starts_with("https://")
        {
            return Err(crate::Error::config(format!(
                "CDP endpoint must use HTTP or HTTPS scheme. Got: {}",
                self.cdp_endpoint
            )));
        }
        if self.navigation_timeout_secs == 0 {
            return Err(crate::Error::config("Navigation timeout must be > 0"));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(crate::Error::config("Viewport dimensions must be > 0"));
        }
        if self.screenshot_dir.as_os_str().is_empty() {
            return Err(crate::Error::config("Screenshot directory cannot be empty"));
        }
        Ok(())
    }

    /// Launch options for a new browser session
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            viewport: self.viewport,
            user_agent: self.user_agent.clone(),
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            cdp_endpoint: default_cdp_endpoint(),
            headless: default_headless(),
            viewport: Viewport::default(),
            user_agent: None,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            screenshot_dir: default_screenshot_dir(),
            screenshot_url_prefix: default_screenshot_url_prefix(),
        }
    }
}

fn default_cdp_endpoint() -> String {
    "http://127.0.0.1:9222".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("./public/screenshots")
}

fn default_screenshot_url_prefix() -> String {
    "/screenshots".to_string()
}

/// Status polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval between polls (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Give up after this long (in seconds); `None` polls until terminal or cancelled
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl PollingConfig {
    /// Validate the polling configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_ms == 0 {
            return Err(crate::Error::config("Polling interval must be > 0"));
        }
        if self.timeout_secs == Some(0) {
            return Err(crate::Error::config("Polling timeout must be > 0 when set"));
        }
        Ok(())
    }

    /// Interval between polls
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Overall polling deadline
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Polling config with an explicit interval (handy for tests)
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis().max(1) as u64,
            timeout_secs: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            timeout_secs: None,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Catalog entry for a generic provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Provider with an address-change API
    Api {
        /// Registry key
        id: String,
        /// Display name
        name: String,
        /// Display grouping
        category: String,
        /// API base URL (e.g., "https://api.provider.example/v1")
        base_url: String,
    },

    /// Provider the user updates by hand
    Manual {
        /// Registry key
        id: String,
        /// Display name
        name: String,
        /// Display grouping
        category: String,
        /// Provider's own change-of-address page
        instructions_url: String,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let (id, url) = match self {
            ProviderConfig::Api { id, base_url, .. } => (id, base_url),
            ProviderConfig::Manual {
                id,
                instructions_url,
                ..
            } => (id, instructions_url),
        };

        if id.is_empty() {
            return Err(crate::Error::config("Provider id cannot be empty"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(crate::Error::config(format!(
                "Provider id '{}' may only contain lowercase letters, digits and hyphens",
                id
            )));
        }
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Provider '{}' URL must use HTTP or HTTPS scheme. Got: {}",
                id, url
            )));
        }
        Ok(())
    }

    /// Registry key of this provider
    pub fn id(&self) -> &str {
        match self {
            ProviderConfig::Api { id, .. } | ProviderConfig::Manual { id, .. } => id,
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Api { .. } => "api",
            ProviderConfig::Manual { .. } => "manual",
        }
    }
}
