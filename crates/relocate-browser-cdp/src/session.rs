//! A page inside an isolated browser context.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use relocate_core::error::{Error, Result};
use relocate_core::traits::BrowserSession;
use relocate_core::FormField;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::connection::CdpConnection;
use crate::error::CdpError;
use crate::protocol::InspectedInput;
use crate::script;

const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Grace period for a click to start a navigation
const NAVIGATION_START_GRACE: Duration = Duration::from_millis(250);

/// One page in its own browser context, on its own connection.
pub struct CdpSession {
    connection: CdpConnection,
    browser_context_id: String,
    target_id: String,
    session_id: String,
    navigation_timeout: Duration,
    closed: bool,
}

impl CdpSession {
    pub(crate) fn new(
        connection: CdpConnection,
        browser_context_id: String,
        target_id: String,
        session_id: String,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            connection,
            browser_context_id,
            target_id,
            session_id,
            navigation_timeout,
            closed: false,
        }
    }

    /// Send a command to this page.
    async fn call(&mut self, method: &str, params: Option<Value>) -> std::result::Result<Value, CdpError> {
        if self.closed {
            return Err(CdpError::SessionClosed);
        }
        self.connection
            .call(method, params, Some(&self.session_id))
            .await
    }

    /// Evaluate an expression and return its value.
    async fn evaluate(&mut self, expression: &str) -> std::result::Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("unknown exception");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Run a script that answers `false` when its locator matched nothing.
    async fn act_on(&mut self, locator: &str, expression: String) -> Result<()> {
        match self.evaluate(&expression).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(Error::element_not_found(locator)),
        }
    }

    /// Wait until the document is interactive.
    ///
    /// Evaluation errors while a new document is being committed are
    /// expected and retried until the timeout.
    async fn wait_for_load(&mut self) -> Result<()> {
        let started = Instant::now();
        loop {
            match self.evaluate(script::READY_STATE).await {
                Ok(Value::String(state)) if state == "complete" || state == "interactive" => {
                    return Ok(());
                }
                Ok(_) => {}
                Err(e @ (CdpError::Protocol { .. } | CdpError::JavaScript(_))) => {
                    debug!("Page not ready yet: {}", e);
                }
                Err(e) => return Err(e.into()),
            }

            if started.elapsed() > self.navigation_timeout {
                return Err(Error::navigation(format!(
                    "Page did not load within {:?}",
                    self.navigation_timeout
                )));
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let result = self
            .call("Page.navigate", Some(json!({ "url": url })))
            .await
            .map_err(|e| match e {
                CdpError::Timeout(msg) => Error::navigation(msg),
                other => other.into(),
            })?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(Error::navigation(format!("{}: {}", url, error)));
        }

        self.wait_for_load().await?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    async fn fill(&mut self, locator: &str, value: &str) -> Result<()> {
        self.act_on(locator, script::fill(locator, value)).await
    }

    async fn click(&mut self, locator: &str) -> Result<()> {
        self.act_on(locator, script::click(locator)).await
    }

    async fn wait_for_navigation(&mut self) -> Result<()> {
        tokio::time::sleep(NAVIGATION_START_GRACE).await;
        self.wait_for_load().await
    }

    async fn current_url(&mut self) -> Result<String> {
        let value = self.evaluate(script::CURRENT_URL).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::InvalidResponse("location is not a string".into()).into())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let result = self
            .call("Page.captureScreenshot", Some(json!({ "format": "png" })))
            .await?;

        let data = result["data"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))?;

        STANDARD
            .decode(data)
            .map_err(|e| Error::infrastructure(format!("Screenshot is not valid base64: {}", e)))
    }

    async fn inspect_inputs(&mut self) -> Result<Vec<FormField>> {
        let value = self.evaluate(script::INSPECT_INPUTS).await?;
        let json = value
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("inspection did not return JSON".into()))?;
        let inputs: Vec<InspectedInput> = serde_json::from_str(json).map_err(CdpError::from)?;
        Ok(script::to_form_fields(inputs))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let context_id = self.browser_context_id.clone();
        let disposed = self
            .connection
            .call(
                "Target.disposeBrowserContext",
                Some(json!({ "browserContextId": context_id })),
                None,
            )
            .await;
        self.closed = true;
        self.connection.close().await;

        match disposed {
            Ok(_) => {
                debug!("Closed target {}", self.target_id);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to dispose browser context {}: {}", context_id, e);
                Err(e.into())
            }
        }
    }
}
