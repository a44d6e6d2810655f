//! Providers with an address-change API.
//!
//! ```http
//! GET  {base}/account/{accountNumber}
//! POST {base}/address-changes
//! GET  {base}/address-changes/{reference}
//! Authorization: Bearer <apiKey>
//! ```

use async_trait::async_trait;
use relocate_core::error::{Error, Result};
use relocate_core::model::{Address, ServiceCredentials};
use relocate_core::result::ServiceUpdateResult;
use relocate_core::traits::{AddressUpdateService, IntegrationType, ensure_required_credentials};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default HTTP timeout for provider API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `POST /address-changes`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressChangeRequest<'a> {
    account_number: &'a str,
    old_address: &'a Address,
    new_address: &'a Address,
}

/// Provider's view of one address change
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteChange {
    pub reference: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl RemoteChange {
    /// Translate the provider's status word
    ///
    /// | status               | result                          |
    /// |----------------------|---------------------------------|
    /// | `completed`          | success                         |
    /// | `rejected`, `failed` | `success: false`                |
    /// | anything else        | pending (accepted, not applied) |
    pub fn into_result(self) -> ServiceUpdateResult {
        let status = self.status.to_ascii_lowercase();
        let message = self
            .message
            .unwrap_or_else(|| format!("Address change {}", status));

        let result = match status.as_str() {
            "completed" => ServiceUpdateResult::succeeded(message),
            "rejected" | "failed" => ServiceUpdateResult::failed(message)
                .with_error(format!("Provider reported status {}", self.status)),
            _ => ServiceUpdateResult::pending(message),
        };
        result.with_reference(self.reference)
    }
}

/// Integration speaking the generic address-change API
pub struct ApiAddressService {
    id: String,
    name: String,
    category: String,
    base_url: String,
    client: reqwest::Client,
    account_number: Option<String>,
    /// ⚠️ NEVER log this value
    api_key: Option<String>,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ApiAddressService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiAddressService")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("account_number", &self.account_number)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl ApiAddressService {
    /// Create an uninitialized instance
    ///
    /// The client is shared between instances; it holds no credentials.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            account_number: None,
            api_key: None,
        }
    }

    fn session(&self) -> Result<(&str, &str)> {
        match (self.account_number.as_deref(), self.api_key.as_deref()) {
            (Some(account), Some(key)) => Ok((account, key)),
            _ => Err(Error::infrastructure(format!(
                "{} is not initialized",
                self.id
            ))),
        }
    }

    /// Base URL with `segments` appended, each percent-encoded as one segment
    fn url<I>(&self, segments: I) -> Result<reqwest::Url>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            Error::config(format!("{}: invalid base URL {}: {}", self.id, self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                Error::config(format!("{}: base URL {} cannot take a path", self.id, self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let (_, api_key) = self.session()?;
        request
            .bearer_auth(api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::infrastructure(format!("{}: HTTP request failed: {}", self.id, e)))
    }

    async fn parse_change(&self, response: reqwest::Response) -> Result<ServiceUpdateResult> {
        let change: RemoteChange = response.json().await.map_err(|e| {
            Error::infrastructure(format!("{}: Failed to parse response: {}", self.id, e))
        })?;
        Ok(change.into_result())
    }

    /// Caller-supplied path values must name exactly one segment
    fn path_value<'a>(&self, what: &str, value: &'a str) -> Result<&'a str> {
        if matches!(value.trim(), "" | "." | "..") {
            return Err(Error::invalid_input(format!(
                "{}: {} {:?} cannot be used in a request path",
                self.id, what, value
            )));
        }
        Ok(value)
    }

    /// 5xx means the provider is down; any other non-success status is its answer
    async fn rejection_or_error(
        &self,
        response: reqwest::Response,
    ) -> Result<ServiceUpdateResult> {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        if status.is_server_error() {
            return Err(Error::infrastructure(format!(
                "{} server error (transient): {} - {}",
                self.id, status, error_text
            )));
        }

        warn!("{} refused the request: {}", self.id, status);
        Ok(ServiceUpdateResult::failed(format!("{} refused the address change", self.name))
            .with_error(format!("{} - {}", status, error_text)))
    }
}

#[async_trait]
impl AddressUpdateService for ApiAddressService {
    fn service_id(&self) -> &str {
        &self.id
    }

    fn service_name(&self) -> &str {
        &self.name
    }

    fn service_category(&self) -> &str {
        &self.category
    }

    fn integration_type(&self) -> IntegrationType {
        IntegrationType::Api
    }

    fn get_required_credentials(&self) -> &'static [&'static str] {
        &["accountNumber", "apiKey"]
    }

    async fn initialize(&mut self, credentials: &ServiceCredentials) -> Result<()> {
        let credentials = ensure_required_credentials(&*self, credentials)?;
        self.account_number = credentials.get("accountNumber").map(str::to_string);
        self.api_key = credentials.get("apiKey").map(str::to_string);
        debug!("{} initialized against {}", self.id, self.base_url);
        Ok(())
    }

    async fn validate_credentials(&mut self) -> Result<bool> {
        let (account, _) = self.session()?;
        let url = self.url(["account", self.path_value("account number", account)?])?;
        let response = self.send(self.client.get(url)).await?;

        let status = response.status();
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!("{} refused credentials: {}", self.id, status);
                Ok(false)
            }
            s if s.is_server_error() => Err(Error::infrastructure(format!(
                "{} server error (transient): {}",
                self.id, s
            ))),
            s => Err(Error::http(format!(
                "{}: unexpected status {} on account lookup",
                self.id, s
            ))),
        }
    }

    async fn update_address(
        &mut self,
        old_address: &Address,
        new_address: &Address,
    ) -> Result<ServiceUpdateResult> {
        let (account, _) = self.session()?;
        let body = AddressChangeRequest {
            account_number: account,
            old_address,
            new_address,
        };

        info!("Submitting address change to {}", self.id);
        let response = self
            .send(self.client.post(self.url(["address-changes"])?).json(&body))
            .await?;

        if !response.status().is_success() {
            return self.rejection_or_error(response).await;
        }
        self.parse_change(response).await
    }

    async fn check_update_status(&mut self, reference: &str) -> Result<ServiceUpdateResult> {
        let url = self.url(["address-changes", self.path_value("reference", reference)?])?;
        let response = self.send(self.client.get(url)).await?;

        if !response.status().is_success() {
            return self.rejection_or_error(response).await;
        }
        self.parse_change(response).await
    }

    async fn cleanup(&mut self) {
        self.account_number = None;
        self.api_key = None;
    }
}
