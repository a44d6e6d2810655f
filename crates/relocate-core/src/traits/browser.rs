// # Browser Automation Traits
//
// The seam between form-automation integrations and whatever drives the
// browser. Integrations depend only on these traits; the CDP engine lives in
// `relocate-browser-cdp` and tests substitute scripted sessions.
//
// ## Ownership
//
// `BrowserEngine::launch` hands out a fresh `BrowserSession` per update
// attempt. The session is owned by exactly one integration instance and is
// closed by its `cleanup`. There is no process-wide browser or page.
//
// ## Error mapping
//
// - Locator matched nothing → `Error::ElementNotFound`
// - Page failed to load or timed out → `Error::Navigation`
// - Transport or browser gone → `Error::Infrastructure`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::forms::FormField;

/// Browser viewport size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Options for a new browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Engines attaching to a running browser can only check this
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    /// Upper bound for a single navigation
    pub navigation_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// Trait for browser engines
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Open an isolated session
    ///
    /// # Errors
    ///
    /// `Error::Initialization` if the engine is unreachable or refuses.
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>>;

    /// Engine name (for logging/debugging)
    fn engine_name(&self) -> &'static str;
}

/// One isolated page driven by a [`BrowserEngine`]
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for the page to become interactive
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Replace the value of the element matched by `locator`
    async fn fill(&mut self, locator: &str, value: &str) -> Result<()>;

    /// Click the element matched by `locator`
    async fn click(&mut self, locator: &str) -> Result<()>;

    /// Wait until the current navigation, if any, settles
    async fn wait_for_navigation(&mut self) -> Result<()>;

    /// URL of the current page
    async fn current_url(&mut self) -> Result<String>;

    /// PNG image of the visible page
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Inputs, selects and text areas present on the current page
    async fn inspect_inputs(&mut self) -> Result<Vec<FormField>>;

    /// Tear the session down; later calls are no-ops
    async fn close(&mut self) -> Result<()>;
}
