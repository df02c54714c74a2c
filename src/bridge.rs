//! The lifecycle adapter: bytes in, bytes out.
//!
//! A [`Bridge`] owns nothing mutable. It pairs a shared, frozen
//! [`Registry`] with an [`Executor`] and a [`BridgeConfig`], and every call to
//! [`Bridge::handle`] walks one request through
//!
//! ```text
//! Received -> Decoded -> Resolved -> Validated -> Executed -> Encoded -> Sent
//! ```
//!
//! stopping at the first fault. The fault is encoded like any other outcome,
//! so `handle` always returns one complete response document.

use crate::config::{BridgeConfig, ConfigError};
use crate::envelope::{self, InvocationRequest};
use crate::error::{Fault, FaultKind};
use crate::executor::{Executor, InvocationOutcome};
use crate::registry::Registry;
use crate::tools::ToolDefinition;
use crate::validate::validate;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// How far a request got through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Decoded,
    Resolved,
    Validated,
    Executed,
    Encoded,
    Sent,
}

impl Stage {
    pub const fn name(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Decoded => "decoded",
            Stage::Resolved => "resolved",
            Stage::Validated => "validated",
            Stage::Executed => "executed",
            Stage::Encoded => "encoded",
            Stage::Sent => "sent",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A stateless dispatcher over an immutable tool registry.
///
/// Cloning is cheap and clones share the registry, so a host may hand one
/// bridge to every worker or connection thread.
///
/// # Examples
///
/// ```
/// use toolbridge::{Bridge, BridgeConfig};
/// use toolbridge::registry::Registry;
/// use toolbridge::schema::ValueType;
/// use toolbridge::tools::ToolDefinition;
/// use serde_json::{Value, json};
///
/// let mut builder = Registry::builder();
/// builder
///     .register(
///         ToolDefinition::builder("add")
///             .param("a", ValueType::Integer, "First addend")
///             .param("b", ValueType::Integer, "Second addend")
///             .returns(ValueType::Integer)
///             .handler(|args| Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)),
///     )
///     .unwrap();
/// let bridge = Bridge::new(builder.build(), BridgeConfig::default()).unwrap();
///
/// let response = bridge.handle(br#"{"procedure":"add","arguments":{"a":2,"b":3}}"#);
/// let value: Value = serde_json::from_slice(&response).unwrap();
/// assert_eq!(value, json!({"status": "ok", "result": 5}));
/// ```
#[derive(Debug, Clone)]
pub struct Bridge {
    registry: Arc<Registry>,
    executor: Executor,
    config: BridgeConfig,
}

impl Bridge {
    /// Builds a bridge that owns `registry`.
    ///
    /// # Errors
    ///
    /// Whatever [`BridgeConfig::check`] reports for `config`.
    pub fn new(registry: Registry, config: BridgeConfig) -> Result<Self, ConfigError> {
        Self::from_shared(Arc::new(registry), config)
    }

    /// Builds a bridge over a registry that is already shared.
    ///
    /// # Errors
    ///
    /// Whatever [`BridgeConfig::check`] reports for `config`.
    pub fn from_shared(
        registry: Arc<Registry>,
        config: BridgeConfig,
    ) -> Result<Self, ConfigError> {
        config.check()?;
        Ok(Bridge {
            registry,
            executor: Executor::new(config.timeout()),
            config,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handles one envelope request and returns the encoded response.
    ///
    /// Never fails: every problem becomes an error envelope.
    pub fn handle(&self, body: &[u8]) -> Vec<u8> {
        match envelope::decode(body) {
            Ok(request) => {
                let (outcome, stage) = self.run(&request.procedure, &request.arguments);
                log_outcome(&request.procedure, stage, &outcome);
                envelope::encode(outcome, request.correlation_id)
            }
            Err(error) => {
                let correlation_id = error.correlation_id().map(str::to_owned);
                let outcome = InvocationOutcome::from(Fault::from(error));
                log_outcome("", Stage::Received, &outcome);
                envelope::encode(outcome, correlation_id)
            }
        }
    }

    /// Handles one MCP JSON-RPC message.
    ///
    /// Returns `None` for notifications, which get no response body.
    ///
    /// ```
    /// use toolbridge::{Bridge, BridgeConfig};
    /// use toolbridge::registry::Registry;
    /// use serde_json::{Value, json};
    ///
    /// let bridge = Bridge::new(Registry::builder().build(), BridgeConfig::default()).unwrap();
    ///
    /// let reply = bridge.handle_mcp(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
    /// let value: Value = serde_json::from_slice(&reply).unwrap();
    /// assert_eq!(value, json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
    ///
    /// let note = br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
    /// assert!(bridge.handle_mcp(note).is_none());
    /// ```
    pub fn handle_mcp(&self, body: &[u8]) -> Option<Vec<u8>> {
        crate::mcp::dispatch(self, body)
    }

    /// Runs an already-decoded request.
    pub fn invoke(&self, request: &InvocationRequest) -> InvocationOutcome {
        let (outcome, stage) = self.run(&request.procedure, &request.arguments);
        log_outcome(&request.procedure, stage, &outcome);
        outcome
    }

    fn run(&self, procedure: &str, arguments: &Map<String, Value>) -> (InvocationOutcome, Stage) {
        match self.registry.resolve(procedure) {
            Ok(definition) => self.call(definition, arguments),
            Err(error) => (
                Fault::new(FaultKind::UnknownProcedure, error.to_string()).into(),
                Stage::Decoded,
            ),
        }
    }

    /// Validates and executes a resolved tool.
    pub(crate) fn call(
        &self,
        definition: &ToolDefinition,
        arguments: &Map<String, Value>,
    ) -> (InvocationOutcome, Stage) {
        let arguments = match validate(arguments, definition.input_schema()) {
            Ok(arguments) => arguments,
            Err(mismatch) => return (Fault::from(mismatch).into(), Stage::Resolved),
        };
        match self.executor.execute(definition, arguments) {
            outcome @ InvocationOutcome::Success(_) => (outcome, Stage::Executed),
            outcome @ InvocationOutcome::Fault(_) => (outcome, Stage::Validated),
        }
    }
}

pub(crate) fn log_outcome(procedure: &str, stage: Stage, outcome: &InvocationOutcome) {
    match outcome.fault_kind() {
        None => {
            logwise::info_sync!(
                "{procedure} completed after stage {stage}",
                procedure = procedure.to_string(),
                stage = stage.to_string()
            );
        }
        Some(kind) => {
            logwise::info_sync!(
                "{procedure} faulted with {kind} after stage {stage}",
                procedure = procedure.to_string(),
                kind = kind.to_string(),
                stage = stage.to_string()
            );
        }
    }
}
