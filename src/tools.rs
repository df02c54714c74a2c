//! Tool definitions: the named, typed procedures a [`Registry`](crate::registry::Registry) serves.
//!
//! There are two ways to define a tool:
//!
//! - implement the [`Tool`] trait on a type and convert it with
//!   [`ToolDefinition::from_tool`], or
//! - describe it inline with [`ToolDefinition::builder`] and a closure.
//!
//! Either way the result is an immutable [`ToolDefinition`]. Handlers receive
//! [`Arguments`] that have already been validated against the declared
//! parameters, so a handler only has to deal with its own domain failures.
//!
//! # Implementing the trait
//!
//! ```
//! use toolbridge::tools::{Arguments, Tool, ToolCallError, ToolDefinition};
//! use toolbridge::schema::{InputSchema, Parameter, ValueType};
//! use serde_json::{Value, json};
//!
//! struct Greet;
//!
//! impl Tool for Greet {
//!     fn name(&self) -> &str {
//!         "greet"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Greets a user by name"
//!     }
//!
//!     fn input_schema(&self) -> InputSchema {
//!         InputSchema::new(vec![Parameter::required("name", ValueType::String, "Name to greet")])
//!     }
//!
//!     fn return_type(&self) -> ValueType {
//!         ValueType::String
//!     }
//!
//!     fn call(&self, arguments: Arguments) -> Result<Value, ToolCallError> {
//!         let name: String = arguments.get("name")?;
//!         Ok(json!(format!("Hello, {name}!")))
//!     }
//! }
//!
//! let definition = ToolDefinition::from_tool(Greet);
//! assert_eq!(definition.name(), "greet");
//! ```
//!
//! # Using the builder
//!
//! ```
//! use toolbridge::tools::{ToolCallError, ToolDefinition};
//! use toolbridge::schema::ValueType;
//!
//! let divide = ToolDefinition::builder("divide")
//!     .description("Divide two integers")
//!     .param("a", ValueType::Integer, "Dividend")
//!     .param("b", ValueType::Integer, "Divisor")
//!     .returns(ValueType::Integer)
//!     .handler(|args| {
//!         let a: i64 = args.get("a")?;
//!         let b: i64 = args.get("b")?;
//!         a.checked_div(b).ok_or_else(|| ToolCallError::new("division by zero"))
//!     });
//!
//! assert_eq!(divide.input_schema().parameters().len(), 2);
//! ```

use crate::schema::{InputSchema, Parameter, ValueType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Trait for implementing tools as types.
///
/// Tools must be `Send + Sync`: the same definition serves every request and
/// each call runs on its own worker thread.
///
/// Implementations must not carry mutable state from one call into the next.
/// The engine gives no guarantees about tools that do.
pub trait Tool: Send + Sync {
    /// The unique name callers use to invoke the tool.
    fn name(&self) -> &str;

    /// A human-readable description, advertised by `tools/list`.
    fn description(&self) -> &str;

    /// The parameters the tool accepts.
    fn input_schema(&self) -> InputSchema;

    /// The JSON type of a successful result.
    fn return_type(&self) -> ValueType {
        ValueType::Any
    }

    /// Executes the tool.
    ///
    /// `arguments` already satisfy [`input_schema`](Tool::input_schema).
    fn call(&self, arguments: Arguments) -> Result<Value, ToolCallError>;
}

/// Type-erased handler stored in a [`ToolDefinition`].
pub(crate) type Handler = Arc<dyn Fn(Arguments) -> Result<Value, ToolCallError> + Send + Sync>;

/// An immutable, registered tool.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    input_schema: InputSchema,
    return_type: ValueType,
    handler: Handler,
}

impl ToolDefinition {
    /// Starts describing a tool named `name`.
    pub fn builder(name: impl Into<String>) -> ToolBuilder {
        ToolBuilder {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            return_type: ValueType::Any,
        }
    }

    /// Wraps a [`Tool`] implementation.
    pub fn from_tool<T: Tool + 'static>(tool: T) -> Self {
        let tool = Arc::new(tool);
        let name = tool.name().to_string();
        let description = tool.description().to_string();
        let input_schema = tool.input_schema();
        let return_type = tool.return_type();
        ToolDefinition {
            name,
            description,
            input_schema,
            return_type,
            handler: Arc::new(move |arguments| tool.call(arguments)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &InputSchema {
        &self.input_schema
    }

    pub fn return_type(&self) -> ValueType {
        self.return_type
    }

    pub(crate) fn handler(&self) -> Handler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`ToolDefinition::builder`].
#[derive(Debug)]
pub struct ToolBuilder {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    return_type: ValueType,
}

impl ToolBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declares a required parameter.
    pub fn param(
        mut self,
        name: impl Into<String>,
        value_type: ValueType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters
            .push(Parameter::required(name, value_type, description));
        self
    }

    /// Declares a parameter the caller may omit.
    pub fn optional(
        mut self,
        name: impl Into<String>,
        value_type: ValueType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters
            .push(Parameter::optional(name, value_type, description));
        self
    }

    /// Declares the result type. Defaults to [`ValueType::Any`].
    pub fn returns(mut self, value_type: ValueType) -> Self {
        self.return_type = value_type;
        self
    }

    /// Finishes the definition with its handler.
    ///
    /// The handler may return any [`Serialize`] type. A value that cannot be
    /// converted to JSON becomes a `SerializationError` fault, not a handler
    /// error.
    pub fn handler<F, T>(self, handler: F) -> ToolDefinition
    where
        F: Fn(Arguments) -> Result<T, ToolCallError> + Send + Sync + 'static,
        T: Serialize,
    {
        ToolDefinition {
            name: self.name,
            description: self.description,
            input_schema: InputSchema::new(self.parameters),
            return_type: self.return_type,
            handler: Arc::new(move |arguments| {
                let value = handler(arguments)?;
                serde_json::to_value(value).map_err(ToolCallError::unrepresentable)
            }),
        }
    }
}

/// Validated arguments for a single call.
///
/// Only arguments named in the tool's schema are present, and each has the
/// declared type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Arguments(values)
    }

    /// Deserializes the argument `name`.
    ///
    /// ```
    /// use toolbridge::tools::Arguments;
    /// use serde_json::json;
    ///
    /// let args = Arguments::new(json!({"a": 2}).as_object().unwrap().clone());
    /// assert_eq!(args.get::<i64>("a").unwrap(), 2);
    /// assert!(args.get::<i64>("b").is_err());
    /// ```
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ToolCallError> {
        self.get_opt(name)?
            .ok_or_else(|| ToolCallError::new(format!("missing argument `{name}`")))
    }

    /// Like [`get`](Arguments::get), but an absent argument is `Ok(None)`.
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ToolCallError> {
        match self.0.get(name) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ToolCallError::new(format!("argument `{name}`: {e}"))),
        }
    }

    /// The raw JSON value of an argument.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(values: Map<String, Value>) -> Self {
        Arguments(values)
    }
}

/// The error a handler returns.
///
/// ```
/// use toolbridge::tools::ToolCallError;
/// use serde_json::json;
///
/// let error = ToolCallError::new("Cannot divide by zero").with_detail(json!({"b": 0}));
/// assert_eq!(error.to_string(), "Cannot divide by zero");
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolCallError {
    /// The tool could not complete. Reported to the caller as `HandlerError`.
    #[error("{message}")]
    Failed {
        message: String,
        detail: Option<Value>,
    },
    /// The result could not be converted to JSON. Reported as `SerializationError`.
    #[error("result is not representable as JSON: {0}")]
    Unrepresentable(String),
}

impl ToolCallError {
    /// Creates a handler failure with a message.
    pub fn new(message: impl Into<String>) -> Self {
        ToolCallError::Failed {
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches structured detail. Has no effect on `Unrepresentable`.
    pub fn with_detail(self, detail: Value) -> Self {
        match self {
            ToolCallError::Failed { message, .. } => ToolCallError::Failed {
                message,
                detail: Some(detail),
            },
            other => other,
        }
    }

    pub(crate) fn unrepresentable(error: serde_json::Error) -> Self {
        ToolCallError::Unrepresentable(error.to_string())
    }
}

impl From<String> for ToolCallError {
    fn from(message: String) -> Self {
        ToolCallError::new(message)
    }
}

impl From<&str> for ToolCallError {
    fn from(message: &str) -> Self {
        ToolCallError::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::new(map),
            _ => Arguments::default(),
        }
    }

    #[test]
    fn builder_handler_serializes_result() {
        let tool = ToolDefinition::builder("pair")
            .returns(ValueType::Array)
            .handler(|_| Ok((1, "two")));
        let handler = tool.handler();
        assert_eq!(handler(Arguments::default()), Ok(json!([1, "two"])));
    }

    #[test]
    fn unserializable_result_is_unrepresentable() {
        // map keys must be strings in JSON
        let tool = ToolDefinition::builder("bad").handler(|_| {
            let mut map = BTreeMap::new();
            map.insert((1, 2), "x");
            Ok(map)
        });
        let handler = tool.handler();
        assert!(matches!(
            handler(Arguments::default()),
            Err(ToolCallError::Unrepresentable(_))
        ));
    }

    #[test]
    fn handler_error_passes_through() {
        let tool = ToolDefinition::builder("fail")
            .handler(|_| Err::<(), _>(ToolCallError::new("nope")));
        let handler = tool.handler();
        assert_eq!(handler(Arguments::default()), Err(ToolCallError::new("nope")));
    }

    #[test]
    fn get_opt_distinguishes_absent_from_wrong_type() {
        let args = args(json!({"n": "five"}));
        assert_eq!(args.get_opt::<i64>("missing"), Ok(None));
        assert!(args.get_opt::<i64>("n").is_err());
        assert_eq!(args.get_opt::<String>("n"), Ok(Some("five".to_string())));
    }

    #[test]
    fn with_detail_ignored_for_unrepresentable() {
        let error = ToolCallError::Unrepresentable("x".into()).with_detail(json!(1));
        assert_eq!(error, ToolCallError::Unrepresentable("x".into()));
    }
}
