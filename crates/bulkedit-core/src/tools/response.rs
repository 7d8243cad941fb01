//! Wire envelope for tool calls

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{success, result?, error?}` returned by every tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Whether the call did what was asked
    pub success: bool,
    /// Operation-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Human-readable failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    /// A successful call carrying `payload`
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        Self::with_status(true, payload, None)
    }

    /// A call whose outcome is decided by the payload itself
    pub fn with_status<T: Serialize>(success: bool, payload: &T, error: Option<String>) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => Self {
                success,
                result: Some(value),
                error,
            },
            Err(e) => Self::err(format!("Failed to encode result: {}", e)),
        }
    }

    /// A failed call with no payload
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_omits_error() {
        let json = serde_json::to_value(ToolResponse::ok(&json!({"n": 1}))).unwrap();
        assert_eq!(json, json!({"success": true, "result": {"n": 1}}));
    }

    #[test]
    fn test_err_omits_result() {
        let json = serde_json::to_value(ToolResponse::err("boom")).unwrap();
        assert_eq!(json, json!({"success": false, "error": "boom"}));
    }
}
