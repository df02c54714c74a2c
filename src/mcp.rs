//! MCP over JSON-RPC, in stateless JSON-response mode.
//!
//! Each message is answered on its own. No session id is issued and nothing
//! is remembered between messages, so `initialize` is informational only and
//! a client may call `tools/call` without it.
//!
//! Tool faults that happen after the tool is resolved are reported as tool
//! results with `isError: true`, the way MCP expects. An unknown tool name is
//! a protocol error.

use crate::bridge::{Bridge, log_outcome};
use crate::executor::InvocationOutcome;
use crate::jrpc::{Error, Notification, Request, Response, VERSION};
use crate::tools::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

pub(crate) fn dispatch(bridge: &Bridge, body: &[u8]) -> Option<Vec<u8>> {
    let message: Value = match serde_json::from_slice(body) {
        Ok(message) => message,
        Err(e) => {
            logwise::warn_sync!("unparseable MCP message: {error}", error = e.to_string());
            return Some(write(&Response::<()>::err(Error::parse_error(), Value::Null)));
        }
    };
    if message.is_array() {
        return Some(write(&Response::<()>::err(Error::invalid_request(), Value::Null)));
    }
    let request: Request = match serde_json::from_value(message.clone()) {
        Ok(request) => request,
        Err(_) => {
            return match serde_json::from_value::<Notification>(message) {
                Ok(notification) if notification.jsonrpc == VERSION => {
                    logwise::info_sync!(
                        "notification {method} accepted",
                        method = notification.method
                    );
                    None
                }
                _ => Some(write(&Response::<()>::err(Error::invalid_request(), Value::Null))),
            };
        }
    };
    if request.jsonrpc != VERSION {
        return Some(write(&Response::<()>::err(Error::invalid_request(), request.id)));
    }

    let id = request.id.clone();
    let response = match request.method.as_str() {
        "initialize" => {
            let result = initialize(bridge, request.params.as_ref());
            Response::new(json_or_null(result), id)
        }
        "ping" => Response::new(json!({}), id),
        "tools/list" => Response::new(json_or_null(list(bridge)), id),
        "tools/call" => match call(bridge, request.params) {
            Ok(result) => Response::new(json_or_null(result), id),
            Err(error) => Response::err(error, id),
        },
        other => {
            logwise::warn_sync!("unknown MCP method {method}", method = other.to_string());
            Response::err(Error::method_not_found(), id)
        }
    };
    Some(write(&response))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: &'static str,
    capabilities: Value,
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: String,
    version: String,
}

fn initialize(bridge: &Bridge, params: Option<&Value>) -> InitializeResult {
    let requested = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str);
    InitializeResult {
        protocol_version: negotiate(requested),
        capabilities: json!({"tools": {"listChanged": false}}),
        server_info: ServerInfo {
            name: bridge.config().server_name.clone(),
            version: bridge.config().server_version.clone(),
        },
    }
}

/// Picks the revision to answer `initialize` with.
///
/// A supported request is echoed; anything else gets the newest revision.
///
/// ```
/// use toolbridge::mcp::negotiate;
///
/// assert_eq!(negotiate(Some("2025-03-26")), "2025-03-26");
/// assert_eq!(negotiate(Some("1999-01-01")), "2025-06-18");
/// assert_eq!(negotiate(None), "2025-06-18");
/// ```
pub fn negotiate(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|r| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|v| **v == r))
        .copied()
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

#[derive(Debug, Serialize)]
struct ToolList {
    tools: Vec<ToolInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolInfo {
    name: String,
    description: String,
    input_schema: Value,
    output_schema: Value,
}

impl From<&ToolDefinition> for ToolInfo {
    fn from(definition: &ToolDefinition) -> Self {
        ToolInfo {
            name: definition.name().to_string(),
            description: definition.description().to_string(),
            input_schema: definition.input_schema().to_json_schema(),
            output_schema: json!({
                "type": "object",
                "properties": {"result": definition.return_type().json_schema()},
                "required": ["result"]
            }),
        }
    }
}

fn list(bridge: &Bridge) -> ToolList {
    ToolList {
        tools: bridge.registry().iter().map(ToolInfo::from).collect(),
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallToolResult {
    content: Vec<TextContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    structured_content: Option<Value>,
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct TextContent {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl From<InvocationOutcome> for CallToolResult {
    fn from(outcome: InvocationOutcome) -> Self {
        match outcome {
            InvocationOutcome::Success(result) => CallToolResult {
                content: vec![TextContent {
                    kind: "text",
                    text: result.to_string(),
                }],
                structured_content: Some(json!({"result": result})),
                is_error: false,
            },
            InvocationOutcome::Fault(fault) => CallToolResult {
                content: vec![TextContent {
                    kind: "text",
                    text: fault.to_string(),
                }],
                structured_content: None,
                is_error: true,
            },
        }
    }
}

fn call(bridge: &Bridge, params: Option<Value>) -> Result<CallToolResult, Error> {
    let params: ToolCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| Error::invalid_params(e.to_string()))?;
    let definition = bridge
        .registry()
        .resolve(&params.name)
        .map_err(|_| Error::unknown_tool(&params.name))?;
    let (outcome, stage) = bridge.call(definition, &params.arguments.unwrap_or_default());
    log_outcome(&params.name, stage, &outcome);
    Ok(outcome.into())
}

fn json_or_null<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        logwise::error_sync!("MCP result failed to encode: {error}", error = e.to_string());
        Value::Null
    })
}

const INTERNAL_FAILURE: &str = concat!(
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"#,
    r#""message":"response could not be encoded"},"id":null}"#
);

fn write<R: Serialize>(response: &Response<R>) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|e| {
        logwise::error_sync!("MCP response failed to encode: {error}", error = e.to_string());
        let fallback = Response::<()>::err(
            Error::internal_error(format!("response could not be encoded: {e}")),
            response.id.clone(),
        );
        serde_json::to_vec(&fallback).unwrap_or_else(|_| INTERNAL_FAILURE.as_bytes().to_vec())
    })
}
