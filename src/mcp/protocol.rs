//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the envelopes exchanged with clients, one per line.
//!
//! # Message Types
//!
//! - **Request**: a method call; answered with exactly one response
//! - **Notification**: a `notifications/*` method; never answered
//! - **Response**: echoes the request `id` and carries exactly one of
//!   `result` or `error`
//!
//! # Identifiers
//!
//! Request IDs may be any JSON scalar. A request without an ID is answered
//! with the [`MISSING_ID`] sentinel; a line that cannot be parsed at all is
//! answered with the [`PARSE_ERROR_ID`] sentinel.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "student-records-mcp";

/// The JSON-RPC version tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// ID used when answering a line that could not be parsed.
pub const PARSE_ERROR_ID: &str = "error";

/// ID used when answering a request that carried no ID.
pub const MISSING_ID: &str = "unknown";

/// Method prefix shared by all fire-and-forget notifications.
pub const NOTIFICATION_PREFIX: &str = "notifications/";

/// A JSON-RPC 2.0 request ID.
///
/// `null` is treated as an absent ID rather than a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID (integer or float).
    Number(Number),
    /// String request ID.
    String(String),
    /// Boolean request ID.
    Bool(bool),
}

impl RequestId {
    /// Sentinel ID for unparseable input.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::String(PARSE_ERROR_ID.to_string())
    }

    /// Sentinel ID for requests that carried none.
    #[must_use]
    pub fn missing() -> Self {
        Self::String(MISSING_ID.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// An incoming JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version tag. Not enforced.
    #[serde(default)]
    pub jsonrpc: String,

    /// Caller-supplied identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The method to invoke.
    #[serde(default)]
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with the current protocol version tag.
    #[must_use]
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Returns `true` if this message expects no response.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.method.starts_with(NOTIFICATION_PREFIX)
    }

    /// The ID to echo in the response.
    #[must_use]
    pub fn response_id(&self) -> RequestId {
        self.id.clone().unwrap_or_else(RequestId::missing)
    }
}

/// The JSON-RPC 2.0 error codes used by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Looks up the error code for a numeric value.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -32700 => Some(Self::ParseError),
            -32601 => Some(Self::MethodNotFound),
            -32602 => Some(Self::InvalidParams),
            -32603 => Some(Self::InternalError),
            _ => None,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// A parse error describing why the line was rejected.
    #[must_use]
    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::with_message(ErrorCode::ParseError, format!("Parse error: {detail}"))
    }

    /// A method-not-found error naming the method.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::with_message(
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    /// An invalid-params error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidParams, message)
    }

    /// An internal error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, message)
    }

    /// Returns the typed code, if it is one this server emits.
    #[must_use]
    pub const fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

/// The payload of a response: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Successful method result.
    Result(Value),
    /// Method failure.
    Error(JsonRpcErrorData),
}

impl From<Result<Value, JsonRpcErrorData>> for Outcome {
    fn from(result: Result<Value, JsonRpcErrorData>) -> Self {
        match result {
            Ok(value) => Self::Result(value),
            Err(error) => Self::Error(error),
        }
    }
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0" on responses produced here.
    pub jsonrpc: String,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// Exactly one of `result` or `error`.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl JsonRpcResponse {
    /// Creates a response carrying `outcome`.
    #[must_use]
    pub fn new(id: RequestId, outcome: impl Into<Outcome>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: outcome.into(),
        }
    }

    /// Creates a new success response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::new(id, Outcome::Result(result))
    }

    /// Creates a new error response.
    #[must_use]
    pub fn error(id: RequestId, error: JsonRpcErrorData) -> Self {
        Self::new(id, Outcome::Error(error))
    }

    /// Creates the response for an unparseable line.
    #[must_use]
    pub fn parse_error(error: JsonRpcErrorData) -> Self {
        Self::error(RequestId::parse_error(), error)
    }

    /// The result payload, if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    /// The error payload, if this is an error response.
    #[must_use]
    pub const fn error_data(&self) -> Option<&JsonRpcErrorData> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(error) => Some(error),
        }
    }
}

/// Parses one line into a request envelope.
///
/// # Errors
///
/// Returns a parse error if the line is not a JSON object with correctly
/// typed envelope fields.
pub fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcErrorData> {
    serde_json::from_str(line).map_err(JsonRpcErrorData::parse_error)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let req = parse_request(json).unwrap();

        assert_eq!(req.id, Some(RequestId::from(1)));
        assert_eq!(req.method, "initialize");
        assert!(!req.is_notification());
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let req = parse_request(json).unwrap();

        assert!(req.is_notification());
        assert!(req.id.is_none());
    }

    #[test]
    fn parse_scalar_ids() {
        let string = parse_request(r#"{"id": "abc-123", "method": "test"}"#).unwrap();
        assert_eq!(string.id, Some(RequestId::from("abc-123")));

        let float = parse_request(r#"{"id": 1.5, "method": "test"}"#).unwrap();
        assert_eq!(float.response_id().to_string(), "1.5");

        let boolean = parse_request(r#"{"id": true, "method": "test"}"#).unwrap();
        assert_eq!(boolean.id, Some(RequestId::Bool(true)));
    }

    #[test]
    fn null_id_is_absent() {
        let req = parse_request(r#"{"jsonrpc": "2.0", "id": null, "method": "tools/list"}"#)
            .unwrap();
        assert!(req.id.is_none());
        assert_eq!(req.response_id(), RequestId::missing());
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_request("not valid json").unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ParseError));
        assert!(err.message.starts_with("Parse error"));
    }

    #[test]
    fn parse_non_object() {
        let err = parse_request("[1, 2, 3]").unwrap_err();
        assert_eq!(err.code, -32700);
    }

    #[test]
    fn parse_structured_id_rejected() {
        let err = parse_request(r#"{"id": {"nested": 1}, "method": "test"}"#).unwrap_err();
        assert_eq!(err.code, -32700);
    }

    #[test]
    fn serialise_success_response() {
        let response = JsonRpcResponse::success(RequestId::from(1), json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn serialise_error_response() {
        let response = JsonRpcResponse::error(
            RequestId::from(1),
            JsonRpcErrorData::method_not_found("unknown/method"),
        );
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
        assert!(!json.contains("result"));
    }

    #[test]
    fn parse_error_uses_sentinel_id() {
        let response = JsonRpcResponse::parse_error(JsonRpcErrorData::parse_error("bad"));
        assert_eq!(response.id, RequestId::String(PARSE_ERROR_ID.to_string()));
    }

    #[test]
    fn response_round_trip() {
        let responses = [
            JsonRpcResponse::success(RequestId::from("a-1"), json!({"tools": []})),
            JsonRpcResponse::error(
                RequestId::from(7),
                JsonRpcErrorData::invalid_params("missing")
                    .with_data(json!({"kind": "validation"})),
            ),
        ];

        for original in responses {
            let line = serde_json::to_string(&original).unwrap();
            let parsed: JsonRpcResponse = serde_json::from_str(&line).unwrap();
            assert_eq!(parsed.id, original.id);
            assert_eq!(parsed.result().is_some(), original.result().is_some());
            assert_eq!(parsed.error_data().is_some(), original.error_data().is_some());
            assert_eq!(parsed, original);
        }
    }

    #[test]
    fn error_code_lookup() {
        for code in [
            ErrorCode::ParseError,
            ErrorCode::MethodNotFound,
            ErrorCode::InvalidParams,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(-32600), None);
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::from(42)), "42");
        assert_eq!(format!("{}", RequestId::from("abc")), "abc");
    }
}
