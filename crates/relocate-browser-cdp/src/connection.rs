//! CDP WebSocket connection.
//!
//! One connection per browser session. Commands are sent one at a time and
//! the connection reads frames until the matching response arrives; events
//! received in between are skipped.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use url::Url;

use crate::error::CdpError;
use crate::protocol::{BrowserVersion, CdpRequest, CdpResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sequential request/response channel to the browser endpoint.
pub struct CdpConnection {
    ws: Option<WsStream>,
    browser: String,
    next_id: u64,
    command_timeout: Duration,
}

impl CdpConnection {
    /// Discover the browser WebSocket URL from `endpoint` and connect.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - DevTools HTTP endpoint (e.g., "http://127.0.0.1:9222")
    pub async fn connect(
        http: &reqwest::Client,
        endpoint: &str,
        command_timeout: Duration,
    ) -> Result<Self, CdpError> {
        let base = Url::parse(endpoint)?;
        let version_url = base.join("/json/version")?;
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = http
            .get(version_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Found browser: {}", version.browser);

        let ws_url = websocket_url(&base, &version.web_socket_debugger_url)?;
        let (ws, _) = tokio_tungstenite::connect_async(ws_url.as_str())
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("WebSocket {}: {}", ws_url, e)))?;

        debug!("CDP connection open to {}", ws_url);
        Ok(Self {
            ws: Some(ws),
            browser: version.browser,
            next_id: 1,
            command_timeout,
        })
    }

    /// Send a CDP command and wait for its response.
    pub async fn call(
        &mut self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };
        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let timeout = self.command_timeout;
        let ws = self.ws.as_mut().ok_or(CdpError::SessionClosed)?;
        ws.send(Message::Text(json.into())).await?;

        match tokio::time::timeout(timeout, read_response(ws, id)).await {
            Ok(result) => result,
            Err(_) => Err(CdpError::Timeout(format!("Request {} timed out", method))),
        }
    }

    /// Close the WebSocket; later calls fail with `SessionClosed`.
    pub async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!("WebSocket close failed: {}", e);
            }
        }
    }

    /// Product string reported by `/json/version` (e.g. "HeadlessChrome/120.0")
    pub fn browser(&self) -> &str {
        &self.browser
    }

    pub fn is_open(&self) -> bool {
        self.ws.is_some()
    }
}

async fn read_response(ws: &mut WsStream, id: u64) -> Result<Value, CdpError> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => {
                trace!("CDP recv: {}", text);
                if let Some(result) = match_response(text.as_str(), id)? {
                    return result;
                }
            }
            Message::Close(_) => return Err(CdpError::SessionClosed),
            _ => {}
        }
    }
    Err(CdpError::SessionClosed)
}

/// Decode a frame; `None` if it is an event or another command's response.
pub(crate) fn match_response(
    text: &str,
    id: u64,
) -> Result<Option<Result<Value, CdpError>>, CdpError> {
    let response: CdpResponse = serde_json::from_str(text)?;
    if response.id != Some(id) {
        return Ok(None);
    }

    Ok(Some(match response.error {
        Some(error) => Err(CdpError::Protocol {
            code: error.code,
            message: error.message,
        }),
        None => Ok(response.result.unwrap_or(Value::Null)),
    }))
}

/// The browser reports its own view of its address; keep its path but use
/// the host we actually reached it on.
pub(crate) fn websocket_url(endpoint: &Url, reported: &str) -> Result<Url, CdpError> {
    let mut ws_url = Url::parse(reported)?;
    if let Some(host) = endpoint.host_str() {
        ws_url
            .set_host(Some(host))
            .map_err(|e| CdpError::BrowserNotAvailable(format!("Invalid host: {}", e)))?;
    }
    if let Some(port) = endpoint.port_or_known_default() {
        ws_url
            .set_port(Some(port))
            .map_err(|_| CdpError::BrowserNotAvailable("Invalid port".to_string()))?;
    }
    if endpoint.scheme() == "https" {
        ws_url
            .set_scheme("wss")
            .map_err(|_| CdpError::BrowserNotAvailable("Invalid scheme".to_string()))?;
    }
    Ok(ws_url)
}
