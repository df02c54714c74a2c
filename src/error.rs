//! Fault taxonomy shared by every stage of the dispatch pipeline.
//!
//! A [`Fault`] is not a crash: it is the failure half of an
//! [`InvocationOutcome`](crate::executor::InvocationOutcome) and is always
//! delivered to the caller inside a normal response envelope.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The kind of failure a request ran into.
///
/// The variant name is the stable label written to the `errorKind` field of
/// the response envelope.
///
/// ```
/// use toolbridge::error::FaultKind;
///
/// assert_eq!(FaultKind::SchemaMismatch.label(), "SchemaMismatch");
/// assert_eq!(serde_json::to_string(&FaultKind::Timeout).unwrap(), "\"Timeout\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    /// The body was not a well-formed envelope.
    MalformedEnvelope,
    /// No tool is registered under the requested name.
    UnknownProcedure,
    /// The arguments do not match the tool's declared parameters.
    SchemaMismatch,
    /// The handler returned an error or panicked.
    HandlerError,
    /// The handler did not finish within the execution budget.
    Timeout,
    /// The result could not be expressed as the declared JSON value.
    SerializationError,
}

impl FaultKind {
    /// Returns the wire label for this kind.
    pub const fn label(self) -> &'static str {
        match self {
            FaultKind::MalformedEnvelope => "MalformedEnvelope",
            FaultKind::UnknownProcedure => "UnknownProcedure",
            FaultKind::SchemaMismatch => "SchemaMismatch",
            FaultKind::HandlerError => "HandlerError",
            FaultKind::Timeout => "Timeout",
            FaultKind::SerializationError => "SerializationError",
        }
    }
}

impl Display for FaultKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A tagged, recoverable failure for a single request.
///
/// # Examples
///
/// ```
/// use toolbridge::error::{Fault, FaultKind};
/// use serde_json::json;
///
/// let fault = Fault::new(FaultKind::HandlerError, "division by zero")
///     .with_detail(json!({"divisor": 0}));
/// assert_eq!(fault.to_string(), "HandlerError: division by zero");
/// assert_eq!(fault.detail, Some(json!({"divisor": 0})));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Fault {
    /// What went wrong.
    pub kind: FaultKind,
    /// Human-readable explanation.
    pub message: String,
    /// Optional structured detail for in-process callers. Not encoded.
    pub detail: Option<serde_json::Value>,
}

impl Fault {
    /// Creates a fault without structured detail.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Fault {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches structured detail to this fault.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}
