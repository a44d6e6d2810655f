// # relocate-browser-cdp
//
// BrowserEngine implementation that drives Chrome/Chromium over the Chrome
// DevTools Protocol.
//
// ## Sessions
//
// Every `launch` opens its own WebSocket connection, creates a fresh
// browser context (separate cookies and storage) and a single page in it.
// Closing the session disposes the context. Nothing is shared between
// sessions except the browser process itself.
//
// ## Usage
//
// ```rust,ignore
// use relocate_browser_cdp::CdpBrowserEngine;
//
// let engine = CdpBrowserEngine::new("http://127.0.0.1:9222")?;
// let mut page = engine.launch(&LaunchOptions::default()).await?;
// page.goto("https://www.britishgas.co.uk/identity/").await?;
// page.close().await?;
// ```
//
// The browser must be started with `--remote-debugging-port`. Whether pages
// render headless is decided by how that browser was started; `launch`
// compares `LaunchOptions::headless` with the product the browser reports
// and warns on a mismatch.

mod connection;
mod error;
mod protocol;
mod script;
mod session;

pub use error::CdpError;
pub use session::CdpSession;

use async_trait::async_trait;
use relocate_core::error::{Error, Result};
use relocate_core::traits::{BrowserEngine, BrowserSession, LaunchOptions};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use connection::CdpConnection;

/// Upper bound for any single CDP command
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Chrome DevTools Protocol browser engine
pub struct CdpBrowserEngine {
    endpoint: String,
    http: reqwest::Client,
}

impl CdpBrowserEngine {
    /// Create an engine for the DevTools endpoint (e.g., "http://127.0.0.1:9222")
    ///
    /// No connection is made until the first `launch`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid CDP endpoint {}: {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_page(
        &self,
        connection: &mut CdpConnection,
        options: &LaunchOptions,
    ) -> std::result::Result<(String, String, String), CdpError> {
        let context = connection
            .call(
                "Target.createBrowserContext",
                Some(json!({ "disposeOnDetach": true })),
                None,
            )
            .await?;
        let context_id = string_field(&context, "browserContextId")?;

        let target = connection
            .call(
                "Target.createTarget",
                Some(json!({
                    "url": "about:blank",
                    "browserContextId": context_id,
                    "width": options.viewport.width,
                    "height": options.viewport.height,
                })),
                None,
            )
            .await?;
        let target_id = string_field(&target, "targetId")?;

        let attached = connection
            .call(
                "Target.attachToTarget",
                Some(json!({ "targetId": target_id, "flatten": true })),
                None,
            )
            .await?;
        let session_id = string_field(&attached, "sessionId")?;

        let session = Some(session_id.as_str());
        connection.call("Page.enable", None, session).await?;
        connection.call("Runtime.enable", None, session).await?;
        connection
            .call(
                "Emulation.setDeviceMetricsOverride",
                Some(json!({
                    "width": options.viewport.width,
                    "height": options.viewport.height,
                    "deviceScaleFactor": 1,
                    "mobile": false,
                })),
                session,
            )
            .await?;
        if let Some(user_agent) = &options.user_agent {
            connection
                .call(
                    "Emulation.setUserAgentOverride",
                    Some(json!({ "userAgent": user_agent })),
                    session,
                )
                .await?;
        }

        Ok((context_id, target_id, session_id))
    }
}

/// Describe a disagreement between the requested and the attached browser mode
fn headless_mismatch(requested: bool, browser: &str) -> Option<String> {
    let headless = browser.starts_with("HeadlessChrome");
    match (requested, headless) {
        (true, false) => Some(format!(
            "Headless pages requested but the attached browser is headed ({})",
            browser
        )),
        (false, true) => Some(format!(
            "Visible pages requested but the attached browser is headless ({})",
            browser
        )),
        _ => None,
    }
}

fn string_field(value: &serde_json::Value, field: &str) -> std::result::Result<String, CdpError> {
    value[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CdpError::InvalidResponse(format!("Missing {}", field)))
}

#[async_trait]
impl BrowserEngine for CdpBrowserEngine {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        let mut connection = CdpConnection::connect(&self.http, &self.endpoint, COMMAND_TIMEOUT)
            .await
            .map_err(|e| Error::initialization(format!("Cannot reach browser: {}", e)))?;

        if let Some(mismatch) = headless_mismatch(options.headless, connection.browser()) {
            warn!("{}", mismatch);
        }

        match self.open_page(&mut connection, options).await {
            Ok((context_id, target_id, session_id)) => {
                info!("Opened browser session {} on {}", session_id, self.endpoint);
                Ok(Box::new(CdpSession::new(
                    connection,
                    context_id,
                    target_id,
                    session_id,
                    options.navigation_timeout,
                )))
            }
            Err(e) => {
                debug!("Page setup failed, closing connection: {}", e);
                connection.close().await;
                Err(Error::initialization(format!("Cannot open page: {}", e)))
            }
        }
    }

    fn engine_name(&self) -> &'static str {
        "cdp"
    }
}
