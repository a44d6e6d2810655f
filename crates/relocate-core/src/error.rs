//! Error types for the relocate system
//!
//! This module defines all error types used throughout the crate.
//!
//! Only conditions that leave an integration unable to reason about provider
//! state are errors. A provider rejecting a value is a
//! [`ServiceUpdateResult`](crate::result::ServiceUpdateResult) with
//! `success: false`, never an `Error`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for relocate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the relocate system
#[derive(Error, Debug)]
pub enum Error {
    /// A session or runtime could not be created for the attempt
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Required credential fields are missing or empty
    #[error("Missing required credentials for {service}: {}", missing.join(", "))]
    Validation {
        /// Service the credentials were offered to
        service: String,
        /// Required fields that were absent or empty
        missing: Vec<String>,
    },

    /// The provider did not accept the credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No integration is registered under this id
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// The session died or was never created
    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),

    /// A page could not be loaded
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// A declared locator did not match anything on the page
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Filesystem errors (screenshots, config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`Error`], stable enough to store in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Initialization,
    Validation,
    Authentication,
    ServiceNotFound,
    Infrastructure,
    PageAutomation,
    Config,
    InvalidInput,
    Other,
}

impl Error {
    /// Create an initialization error
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Create a validation error listing the missing fields
    pub fn validation<I, S>(service: impl Into<String>, missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            service: service.into(),
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "service not found" error
    pub fn service_not_found(service_id: impl Into<String>) -> Self {
        Self::ServiceNotFound(service_id.into())
    }

    /// Create an infrastructure error
    pub fn infrastructure(msg: impl Into<String>) -> Self {
        Self::Infrastructure(msg.into())
    }

    /// Create a navigation error
    pub fn navigation(msg: impl Into<String>) -> Self {
        Self::Navigation(msg.into())
    }

    /// Create an "element not found" error
    pub fn element_not_found(locator: impl Into<String>) -> Self {
        Self::ElementNotFound(locator.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Initialization(_) => ErrorKind::Initialization,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Authentication(_) => ErrorKind::Authentication,
            Error::ServiceNotFound(_) => ErrorKind::ServiceNotFound,
            Error::Infrastructure(_) | Error::Http(_) | Error::Io(_) => ErrorKind::Infrastructure,
            Error::Navigation(_) | Error::ElementNotFound(_) => ErrorKind::PageAutomation,
            Error::Config(_) => ErrorKind::Config,
            Error::InvalidInput(_) | Error::Json(_) => ErrorKind::InvalidInput,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether this error describes the remote page rather than the session
    ///
    /// Integrations absorb page-level errors into a `success: false` result
    /// and only propagate the rest.
    pub fn is_page_level(&self) -> bool {
        self.kind() == ErrorKind::PageAutomation
    }

    /// Whether a caller-initiated retry of the same request can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Infrastructure | ErrorKind::PageAutomation
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
