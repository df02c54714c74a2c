//! JSON-RPC 2.0 message types.
//!
//! Only what the stateless MCP surface needs: requests, notifications,
//! single responses and the standard error objects. Batches are not
//! supported.
//!
//! # Examples
//!
//! ```
//! use toolbridge::jrpc::{Error, Request, Response};
//! use serde_json::json;
//!
//! let request: Request = serde_json::from_str(
//!     r#"{"jsonrpc":"2.0","method":"tools/list","id":1}"#
//! ).unwrap();
//! assert_eq!(request.method, "tools/list");
//!
//! let ok = Response::new(json!({"tools": []}), request.id.clone());
//! let text = serde_json::to_string(&ok).unwrap();
//! assert!(!text.contains("\"error\""));
//!
//! let err: Response<serde_json::Value> = Response::err(Error::method_not_found(), request.id);
//! assert_eq!(err.error.unwrap().code, -32601);
//! ```
//!
//! A message without an `id` is a notification, not a request:
//!
//! ```
//! use toolbridge::jrpc::{Notification, Request};
//!
//! let body = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
//! assert!(serde_json::from_str::<Request>(body).is_err());
//! let n: Notification = serde_json::from_str(body).unwrap();
//! assert_eq!(n.method, "notifications/initialized");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The only protocol version accepted.
pub const VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request: a call that expects a response.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Request {
    /// Protocol version, must be "2.0"
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
    /// Echoed in the response
    pub id: serde_json::Value,
}

impl Request {
    pub fn new(method: String, params: Option<serde_json::Value>, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            method,
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 notification. Never answered.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// A JSON-RPC 2.0 response.
///
/// Carries either `result` or `error`, never both.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Response<R> {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    pub id: serde_json::Value,
}

impl<R> Response<R> {
    pub fn new(result: R, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn err(e: Error, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            result: None,
            error: Some(e),
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
///
/// # Standard Error Codes
///
/// * `-32700` - Parse error (Invalid JSON)
/// * `-32600` - Invalid Request
/// * `-32601` - Method not found
/// * `-32602` - Invalid params
/// * `-32603` - Internal error
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: i32, message: String, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message,
            data,
        }
    }

    /// Invalid JSON was received (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error".to_string(), None)
    }

    /// The JSON is not a valid request object (-32600).
    ///
    /// ```
    /// use toolbridge::jrpc::Error;
    ///
    /// let error = Error::invalid_request();
    /// assert_eq!(error.code, -32600);
    /// assert_eq!(error.message, "Invalid Request");
    /// ```
    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid Request".to_string(), None)
    }

    /// The method does not exist (-32601).
    pub fn method_not_found() -> Self {
        Self::new(-32601, "Method not found".to_string(), None)
    }

    /// The method exists but the params are unusable (-32602).
    ///
    /// ```
    /// use toolbridge::jrpc::Error;
    ///
    /// let error = Error::invalid_params("missing field `name`".to_string());
    /// assert_eq!(error.code, -32602);
    /// assert_eq!(error.data, Some("missing field `name`".into()));
    /// ```
    pub fn invalid_params(detail: String) -> Self {
        Self::new(-32602, "Invalid params".to_string(), Some(detail.into()))
    }

    /// `tools/call` named a tool that is not registered (-32602).
    ///
    /// ```
    /// use toolbridge::jrpc::Error;
    ///
    /// let error = Error::unknown_tool("subtract");
    /// assert_eq!(error.message, "Unknown tool: subtract");
    /// ```
    pub fn unknown_tool(name: &str) -> Self {
        Self::new(-32602, format!("Unknown tool: {name}"), None)
    }

    /// An internal failure (-32603).
    pub fn internal_error(message: String) -> Self {
        Self::new(-32603, message, None)
    }
}
