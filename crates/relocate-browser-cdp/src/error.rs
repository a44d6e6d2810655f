//! CDP error types.

use relocate_core::Error;
use thiserror::Error;

/// Errors raised while talking to the browser.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Browser not reachable at the configured endpoint.
    #[error("Browser not available at {0}. Start Chrome with --remote-debugging-port=9222")]
    BrowserNotAvailable(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol error.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Page script threw.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// Timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Connection already closed.
    #[error("Session closed")]
    SessionClosed,

    /// Unexpected response shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::BrowserNotAvailable(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::BrowserNotAvailable(format!("Invalid URL: {}", e))
    }
}

/// Page-level problems stay page-level; everything else means the session is unusable
impl From<CdpError> for Error {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::JavaScript(msg) => Error::navigation(format!("page script failed: {}", msg)),
            CdpError::BrowserNotAvailable(msg) => Error::initialization(msg),
            other => Error::infrastructure(other.to_string()),
        }
    }
}
