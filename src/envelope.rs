//! Request and response envelopes.
//!
//! The request envelope names a procedure and its arguments:
//!
//! ```json
//! {"procedure": "add", "arguments": {"a": 2, "b": 3}, "correlationId": "req-1"}
//! ```
//!
//! The response envelope is always one complete JSON document:
//!
//! ```json
//! {"status": "ok", "result": 5, "correlationId": "req-1"}
//! {"status": "error", "errorKind": "SchemaMismatch", "message": "b: expected integer, got string"}
//! ```
//!
//! `arguments` may be omitted or `null` when a tool takes none.
//! `correlationId` is optional and echoed back unchanged when supplied.

use crate::error::{Fault, FaultKind};
use crate::executor::InvocationOutcome;
use serde::de;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded procedure call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub procedure: String,
    pub arguments: Map<String, Value>,
    pub correlation_id: Option<String>,
}

#[derive(Deserialize)]
struct RawRequest {
    procedure: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
    #[serde(rename = "correlationId", default)]
    correlation_id: Option<String>,
}

/// The body could not be decoded into an [`InvocationRequest`].
#[derive(Debug, thiserror::Error)]
#[error("malformed envelope: {source}")]
pub struct DecodeError {
    #[source]
    source: serde_json::Error,
    correlation_id: Option<String>,
}

impl DecodeError {
    /// The `correlationId` found in the body, if it was readable at all.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

impl From<DecodeError> for Fault {
    fn from(error: DecodeError) -> Self {
        Fault::new(FaultKind::MalformedEnvelope, error.to_string())
    }
}

/// Decodes a request body.
///
/// Decoding is deterministic: the same bytes always produce equal requests.
///
/// ```
/// use toolbridge::envelope::decode;
/// use serde_json::json;
///
/// let body = br#"{"procedure":"add","arguments":{"a":2,"b":3},"correlationId":"c-7"}"#;
/// let request = decode(body).unwrap();
/// assert_eq!(request.procedure, "add");
/// assert_eq!(request.arguments["b"], json!(3));
/// assert_eq!(request.correlation_id.as_deref(), Some("c-7"));
/// assert_eq!(request, decode(body).unwrap());
///
/// let err = decode(br#"{"arguments":{},"correlationId":"c-8"}"#).unwrap_err();
/// assert_eq!(err.correlation_id(), Some("c-8"));
/// ```
///
/// # Errors
///
/// [`DecodeError`] when the body is not JSON, is not an object, lacks a
/// string `procedure`, or has a non-object `arguments` or non-string
/// `correlationId`.
pub fn decode(body: &[u8]) -> Result<InvocationRequest, DecodeError> {
    let value: Value = serde_json::from_slice(body).map_err(|source| DecodeError {
        source,
        correlation_id: None,
    })?;
    let correlation_id = value
        .get("correlationId")
        .and_then(Value::as_str)
        .map(str::to_owned);
    if !value.is_object() {
        return Err(DecodeError {
            source: de::Error::custom("envelope must be a JSON object"),
            correlation_id,
        });
    }
    match serde_json::from_value::<RawRequest>(value) {
        Ok(raw) => Ok(InvocationRequest {
            procedure: raw.procedure,
            arguments: raw.arguments.unwrap_or_default(),
            correlation_id: raw.correlation_id,
        }),
        Err(source) => Err(DecodeError {
            source,
            correlation_id,
        }),
    }
}

/// The response document.
///
/// A fault's structured detail stays on the [`Fault`]; the envelope carries
/// only its kind and message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResponseEnvelope {
    Ok {
        result: Value,
        #[serde(
            rename = "correlationId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        correlation_id: Option<String>,
    },
    Error {
        #[serde(rename = "errorKind")]
        error_kind: FaultKind,
        message: String,
        #[serde(
            rename = "correlationId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        correlation_id: Option<String>,
    },
}

impl ResponseEnvelope {
    pub fn new(outcome: InvocationOutcome, correlation_id: Option<String>) -> Self {
        match outcome {
            InvocationOutcome::Success(result) => ResponseEnvelope::Ok {
                result,
                correlation_id,
            },
            InvocationOutcome::Fault(fault) => ResponseEnvelope::Error {
                error_kind: fault.kind,
                message: fault.message,
                correlation_id,
            },
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            ResponseEnvelope::Ok { correlation_id, .. }
            | ResponseEnvelope::Error { correlation_id, .. } => correlation_id.as_deref(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseEnvelope::Ok { .. })
    }
}

// last resort when even the fallback envelope cannot be written
const ENCODER_FAILURE: &str = concat!(
    r#"{"status":"error","errorKind":"SerializationError","#,
    r#""message":"response could not be encoded"}"#
);

/// Encodes an outcome into response bytes. Never fails.
///
/// ```
/// use toolbridge::envelope::encode;
/// use toolbridge::executor::InvocationOutcome;
/// use serde_json::{Value, json};
///
/// let bytes = encode(InvocationOutcome::Success(json!(5)), None);
/// let value: Value = serde_json::from_slice(&bytes).unwrap();
/// assert_eq!(value, json!({"status": "ok", "result": 5}));
/// ```
pub fn encode(outcome: InvocationOutcome, correlation_id: Option<String>) -> Vec<u8> {
    let envelope = ResponseEnvelope::new(outcome, correlation_id);
    match serde_json::to_vec(&envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            logwise::error_sync!(
                "response envelope failed to encode: {error}",
                error = e.to_string()
            );
            let fallback = ResponseEnvelope::Error {
                error_kind: FaultKind::SerializationError,
                message: format!("response could not be encoded: {e}"),
                correlation_id: envelope.correlation_id().map(str::to_owned),
            };
            serde_json::to_vec(&fallback)
                .unwrap_or_else(|_| ENCODER_FAILURE.as_bytes().to_vec())
        }
    }
}
