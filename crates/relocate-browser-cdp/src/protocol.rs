//! CDP protocol types and message definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response or event message.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP error in response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Browser version info.
///
/// Note: Chrome returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Input description returned by the inspection script.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectedInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_request_serialize() {
        let req = CdpRequest {
            id: 7,
            method: "Page.navigate".to_string(),
            params: Some(serde_json::json!({"url": "https://www.britishgas.co.uk/identity/"})),
            session_id: Some("S1".to_string()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["sessionId"], "S1");
        assert_eq!(json["params"]["url"], "https://www.britishgas.co.uk/identity/");
    }

    #[test]
    fn test_cdp_request_omits_empty_fields() {
        let req = CdpRequest {
            id: 1,
            method: "Target.createBrowserContext".to_string(),
            params: None,
            session_id: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("params"));
        assert!(!json.contains("sessionId"));
    }

    #[test]
    fn test_cdp_error_response_deserialize() {
        let json = r#"{"id": 3, "error": {"code": -32000, "message": "No target with given id"}}"#;
        let resp: CdpResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.id, Some(3));
        assert_eq!(resp.error.unwrap().code, -32000);
    }

    #[test]
    fn test_event_has_no_id() {
        let json = r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}, "sessionId": "S1"}"#;
        let resp: CdpResponse = serde_json::from_str(json).unwrap();
        assert!(resp.id.is_none());
        assert_eq!(resp.method.as_deref(), Some("Page.loadEventFired"));
    }

    #[test]
    fn test_browser_version_deserialize() {
        let json = r#"{
            "Browser": "HeadlessChrome/120.0.6099.71",
            "Protocol-Version": "1.3",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
        }"#;
        let version: BrowserVersion = serde_json::from_str(json).unwrap();
        assert!(version.browser.starts_with("HeadlessChrome"));
        assert!(version.web_socket_debugger_url.ends_with("/abc"));
    }
}
