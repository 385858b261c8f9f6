//! Request/response envelope for the tool-call transport: each named
//! operation takes a structured request object and returns a structured
//! response object, with errors reported through a typed field rather
//! than an exceptional control path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// A single tool invocation, as read off stdio or an HTTP request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Correlates a response back to its request; generated by the
    /// caller, opaque to the handler.
    pub id: String,
    /// One of the operation names the handler layer dispatches on (e.g.
    /// `store_conversation`, `execute_task`, `sync_memories`).
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// The response to one [`ToolRequest`]. Exactly one of `result` or
/// `error` is populated; input validation runs before the operation
/// executes, so a validation failure never partially mutates state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResponse {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self { id: id.into(), result: Some(result), error: None }
    }

    pub fn err(id: impl Into<String>, error: ToolError) -> Self {
        Self { id: id.into(), result: None, error: Some(error) }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn ok_response_has_no_error() {
        let resp = ToolResponse::ok("req-1", serde_json::json!({"stored": true}));
        assert!(resp.is_success());
        assert!(resp.error.is_none());
    }

    #[test]
    fn err_response_has_no_result() {
        let resp = ToolResponse::err("req-2", ToolError::new(ErrorKind::Validation, "bad input"));
        assert!(!resp.is_success());
        assert!(resp.result.is_none());
    }

    #[test]
    fn request_round_trips_through_json() {
        let req = ToolRequest {
            id: "r1".to_string(),
            tool: "store_conversation".to_string(),
            arguments: serde_json::json!({"content": "hello"}),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: ToolRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool, "store_conversation");
    }
}
