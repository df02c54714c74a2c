//! Bounded execution of tool handlers.
//!
//! Each call runs on its own worker thread while the calling thread waits on a
//! channel with a deadline. When the deadline passes the executor stops
//! waiting and reports [`FaultKind::Timeout`]. The worker is detached: it may
//! keep running, but its result has nowhere to go and is dropped, so it can
//! never surface in a later request.
//!
//! No async runtime is involved. Threads for everyone.

use crate::error::{Fault, FaultKind};
use crate::tools::{Arguments, ToolCallError, ToolDefinition};
use crate::schema::ValueType;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Budget used when the host does not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// Tool names are caller-chosen and may hold bytes a thread name cannot.
const WORKER_THREAD_NAME: &str = "toolbridge-worker";

/// The result of one invocation, produced exactly once per request.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Success(Value),
    Fault(Fault),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success(_))
    }

    /// The fault kind, if this outcome is a fault.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            InvocationOutcome::Success(_) => None,
            InvocationOutcome::Fault(fault) => Some(fault.kind),
        }
    }
}

impl From<Fault> for InvocationOutcome {
    fn from(fault: Fault) -> Self {
        InvocationOutcome::Fault(fault)
    }
}

/// Runs handlers under a wall-clock budget.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use toolbridge::executor::{Executor, InvocationOutcome};
/// use toolbridge::error::FaultKind;
/// use toolbridge::tools::{Arguments, ToolDefinition};
///
/// let slow = ToolDefinition::builder("slow").handler(|_| {
///     std::thread::sleep(Duration::from_secs(5));
///     Ok(())
/// });
///
/// let executor = Executor::new(Duration::from_millis(20));
/// let outcome = executor.execute(&slow, Arguments::default());
/// assert_eq!(outcome.fault_kind(), Some(FaultKind::Timeout));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    timeout: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Executor::new(DEFAULT_TIMEOUT)
    }
}

impl Executor {
    pub fn new(timeout: Duration) -> Self {
        Executor { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invokes `definition` with already-validated `arguments`.
    ///
    /// Never panics and never returns early without an outcome: handler errors,
    /// handler panics, overruns and results that do not match the declared
    /// return type all become faults.
    pub fn execute(&self, definition: &ToolDefinition, arguments: Arguments) -> InvocationOutcome {
        let handler = definition.handler();
        // capacity 1 so a late worker never blocks on send
        let (sender, receiver) = mpsc::sync_channel(1);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| handler(arguments)))
                    .unwrap_or_else(|payload| {
                        Err(ToolCallError::new(format!(
                            "handler panicked: {}",
                            panic_message(payload.as_ref())
                        )))
                    });
                // the receiver is gone if we already timed out
                let _ = sender.send(result);
            });
        if let Err(e) = spawned {
            return Fault::new(
                FaultKind::HandlerError,
                format!("could not start handler: {e}"),
            )
            .into();
        }

        match receiver.recv_timeout(self.timeout) {
            Ok(Ok(value)) => check_result(definition.return_type(), value),
            Ok(Err(ToolCallError::Failed { message, detail })) => Fault {
                kind: FaultKind::HandlerError,
                message,
                detail,
            }
            .into(),
            Ok(Err(ToolCallError::Unrepresentable(message))) => {
                Fault::new(FaultKind::SerializationError, message).into()
            }
            Err(RecvTimeoutError::Timeout) => {
                logwise::warn_sync!(
                    "tool {tool} exceeded its budget of {budget} ms",
                    tool = definition.name().to_string(),
                    budget = self.timeout.as_millis().to_string()
                );
                Fault::new(
                    FaultKind::Timeout,
                    format!(
                        "{} did not finish within {} ms",
                        definition.name(),
                        self.timeout.as_millis()
                    ),
                )
                .into()
            }
            Err(RecvTimeoutError::Disconnected) => {
                logwise::error_sync!(
                    "tool {tool} worker exited without a result",
                    tool = definition.name().to_string()
                );
                Fault::new(FaultKind::HandlerError, "handler exited without a result").into()
            }
        }
    }
}

fn check_result(declared: ValueType, value: Value) -> InvocationOutcome {
    match declared.admit(&value) {
        Some(admitted) => InvocationOutcome::Success(admitted),
        None => Fault::new(
            FaultKind::SerializationError,
            format!("result: expected {declared}, got {}", ValueType::of(&value)),
        )
        .into(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;

    fn executor() -> Executor {
        Executor::new(Duration::from_secs(5))
    }

    #[test]
    fn success_is_returned() {
        let tool = ToolDefinition::builder("seven")
            .returns(ValueType::Integer)
            .handler(|_| Ok(7));
        assert_eq!(
            executor().execute(&tool, Arguments::default()),
            InvocationOutcome::Success(json!(7))
        );
    }

    #[test]
    fn handler_error_keeps_detail() {
        let tool = ToolDefinition::builder("divide").handler(|_| {
            Err::<i64, _>(ToolCallError::new("division by zero").with_detail(json!({"b": 0})))
        });
        assert_eq!(
            executor().execute(&tool, Arguments::default()),
            InvocationOutcome::Fault(
                Fault::new(FaultKind::HandlerError, "division by zero").with_detail(json!({"b": 0}))
            )
        );
    }

    #[test]
    fn unusual_tool_names_still_run() {
        let tool = ToolDefinition::builder("bad\0name")
            .returns(ValueType::Integer)
            .handler(|_| Ok(1));
        assert_eq!(
            executor().execute(&tool, Arguments::default()),
            InvocationOutcome::Success(json!(1))
        );
    }

    #[test]
    fn panic_is_a_handler_error() {
        let tool = ToolDefinition::builder("boom").handler(|_| -> Result<(), ToolCallError> {
            panic!("kaboom");
        });
        let outcome = executor().execute(&tool, Arguments::default());
        match outcome {
            InvocationOutcome::Fault(fault) => {
                assert_eq!(fault.kind, FaultKind::HandlerError);
                assert_eq!(fault.message, "handler panicked: kaboom");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn timeout_returns_promptly() {
        let tool = ToolDefinition::builder("stuck").handler(|_| {
            thread::sleep(Duration::from_secs(30));
            Ok(())
        });
        let start = Instant::now();
        let outcome = Executor::new(Duration::from_millis(50)).execute(&tool, Arguments::default());
        assert_eq!(outcome.fault_kind(), Some(FaultKind::Timeout));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn wrong_return_type_is_serialization_error() {
        let tool = ToolDefinition::builder("liar")
            .returns(ValueType::Integer)
            .handler(|_| Ok("five"));
        let outcome = executor().execute(&tool, Arguments::default());
        assert_eq!(
            outcome,
            InvocationOutcome::Fault(Fault::new(
                FaultKind::SerializationError,
                "result: expected integer, got string"
            ))
        );
    }

    #[test]
    fn integral_float_result_is_normalized() {
        let tool = ToolDefinition::builder("half")
            .returns(ValueType::Integer)
            .handler(|_| Ok(4.0_f64));
        assert_eq!(
            executor().execute(&tool, Arguments::default()),
            InvocationOutcome::Success(json!(4))
        );
    }
}
