//! Protocol sessions.
//!
//! A session owns one transport and answers its requests one line at a time:
//! parse the line, resolve the method, dispatch, write the response. The next
//! line is not read until the previous response has been flushed, so
//! responses come back in request order.
//!
//! Sessions keep no state between lines. `initialize` is answered like any
//! other method and is not required before `tools/list` or `tools/call`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::mcp::dispatch::Dispatcher;
use crate::mcp::protocol::{
    parse_request, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
    SERVER_NAME,
};
use crate::mcp::tools::registry;
use crate::mcp::transport::LineTransport;

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
struct ToolCallParams {
    /// Name of the tool to call.
    name: String,
    /// Arguments for the tool; anything but an object counts as none.
    #[serde(default)]
    arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}

/// One request/response loop over a line transport.
pub struct Session<R, W> {
    transport: LineTransport<R, W>,
    dispatcher: Dispatcher,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a session over `transport`.
    pub const fn new(transport: LineTransport<R, W>, dispatcher: Dispatcher) -> Self {
        Self {
            transport,
            dispatcher,
        }
    }

    /// Runs until the input ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to read or write. The session
    /// cannot answer anything after that, so it stops.
    pub async fn run(&mut self) -> std::io::Result<()> {
        while let Some(line) = self.transport.read_line().await? {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            if let Some(response) = self.handle_bytes(&line).await {
                self.transport.write_response(&response).await?;
            }
        }

        tracing::debug!("Input closed, ending session");
        Ok(())
    }

    /// Consumes the session, returning the transport's writer.
    pub fn into_writer(self) -> W {
        self.transport.into_writer()
    }

    async fn handle_bytes(&self, line: &[u8]) -> Option<JsonRpcResponse> {
        match std::str::from_utf8(line) {
            Ok(text) => self.handle_line(text).await,
            Err(e) => {
                tracing::warn!(error = %e, "Received non UTF-8 line");
                Some(JsonRpcResponse::parse_error(
                    JsonRpcErrorData::parse_error(e),
                ))
            }
        }
    }

    /// Handles one line of input, returning the response to send, if any.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request = match parse_request(line) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(message = %error.message, "Rejected unparseable line");
                return Some(JsonRpcResponse::parse_error(error));
            }
        };

        if request.is_notification() {
            tracing::debug!(method = %request.method, "Received notification");
            return None;
        }

        let id = request.response_id();
        tracing::debug!(id = %id, method = %request.method, "Handling request");

        let outcome = match request.method.as_str() {
            "initialize" => Ok(Self::handle_initialize()),
            "tools/list" => Ok(json!({ "tools": registry() })),
            "tools/call" => self.handle_tools_call(request).await,
            other => Err(JsonRpcErrorData::method_not_found(other)),
        };

        Some(JsonRpcResponse::new(id, outcome))
    }

    fn handle_initialize() -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
            },
            "serverInfo": ServerInfo::default(),
        })
    }

    async fn handle_tools_call(
        &self,
        request: JsonRpcRequest,
    ) -> Result<Value, JsonRpcErrorData> {
        let Some(params @ Value::Object(_)) = request.params else {
            return Err(JsonRpcErrorData::invalid_params(
                "Invalid params: expected an object",
            ));
        };

        let params: ToolCallParams = serde_json::from_value(params)
            .map_err(|_| JsonRpcErrorData::invalid_params("Tool name is required"))?;

        let arguments = match params.arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        // Store access may block; keep it off the session's task.
        let dispatcher = self.dispatcher.clone();
        let tool = params.name.clone();
        let outcome = tokio::task::spawn_blocking(move || dispatcher.dispatch(&tool, &arguments))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, tool = %params.name, "Tool task failed");
                JsonRpcErrorData::internal_error(format!("Internal error: {e}"))
            })?;

        let result = outcome.map_err(|e| {
            tracing::info!(tool = %params.name, error = %e, "Tool call failed");
            JsonRpcErrorData::from(&e)
        })?;

        let text = serde_json::to_string_pretty(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcErrorData::internal_error("Internal error: failed to serialise result")
        })?;

        serde_json::to_value(ToolCallResult::text(text)).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcErrorData::internal_error("Internal error: failed to serialise result")
        })
    }
}
