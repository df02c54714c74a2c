//! Parameter and return type declarations for tools.
//!
//! A tool declares its parameters as an ordered list of [`Parameter`]s, collected
//! into an [`InputSchema`], and its result as a single [`ValueType`]. The same
//! declarations drive argument validation and the JSON Schema documents
//! advertised by `tools/list`.
//!
//! # Examples
//!
//! ```
//! use toolbridge::schema::{InputSchema, Parameter, ValueType};
//! use serde_json::json;
//!
//! let schema = InputSchema::new(vec![
//!     Parameter::required("a", ValueType::Integer, "First addend"),
//!     Parameter::optional("note", ValueType::String, "Free-form remark"),
//! ]);
//!
//! assert_eq!(schema.parameters().len(), 2);
//! assert_eq!(
//!     schema.to_json_schema(),
//!     json!({
//!         "type": "object",
//!         "properties": {
//!             "a": {"type": "integer", "description": "First addend"},
//!             "note": {"type": "string", "description": "Free-form remark"}
//!         },
//!         "required": ["a"]
//!     })
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt::{Display, Formatter};

/// The JSON type a parameter or result is declared to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// A whole number that fits in an `i64`.
    Integer,
    /// Any finite JSON number, integral or not.
    Number,
    /// A JSON string.
    String,
    /// `true` or `false`.
    Boolean,
    /// A JSON array with elements of any type.
    Array,
    /// A JSON object with members of any type.
    Object,
    /// JSON `null`; the natural return type of tools that produce nothing.
    Null,
    /// Any JSON value.
    Any,
}

impl ValueType {
    /// The name used in schemas and mismatch messages.
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::Null => "null",
            ValueType::Any => "any",
        }
    }

    /// Names the JSON type of a concrete value.
    ///
    /// Whole numbers within the `i64` range report `"integer"`; everything
    /// else numeric reports `"number"`.
    ///
    /// ```
    /// use toolbridge::schema::ValueType;
    /// use serde_json::json;
    ///
    /// assert_eq!(ValueType::of(&json!(3)), "integer");
    /// assert_eq!(ValueType::of(&json!(3.5)), "number");
    /// assert_eq!(ValueType::of(&json!("x")), "string");
    /// ```
    pub fn of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_i64() => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Checks `value` against this type.
    ///
    /// Returns the value to hand to the tool, or `None` on mismatch. The only
    /// conversion performed is numeric widening: an integral float such as
    /// `3.0` is accepted for [`ValueType::Integer`] and normalized to `3`.
    /// Fractional or out-of-range floats are rejected.
    ///
    /// ```
    /// use toolbridge::schema::ValueType;
    /// use serde_json::json;
    ///
    /// assert_eq!(ValueType::Integer.admit(&json!(3.0)), Some(json!(3)));
    /// assert_eq!(ValueType::Integer.admit(&json!(3.5)), None);
    /// assert_eq!(ValueType::Number.admit(&json!(3)), Some(json!(3)));
    /// assert_eq!(ValueType::String.admit(&json!(3)), None);
    /// ```
    pub fn admit(self, value: &Value) -> Option<Value> {
        match self {
            ValueType::Integer => match value {
                Value::Number(n) if n.is_i64() => Some(value.clone()),
                Value::Number(n) => n.as_f64().and_then(integral).map(Value::from),
                _ => None,
            },
            ValueType::Number => value.is_number().then(|| value.clone()),
            ValueType::String => value.is_string().then(|| value.clone()),
            ValueType::Boolean => value.is_boolean().then(|| value.clone()),
            ValueType::Array => value.is_array().then(|| value.clone()),
            ValueType::Object => value.is_object().then(|| value.clone()),
            ValueType::Null => value.is_null().then(|| value.clone()),
            ValueType::Any => Some(value.clone()),
        }
    }

    /// JSON Schema fragment for this type. `Any` is the empty schema.
    pub fn json_schema(self) -> Value {
        match self {
            ValueType::Any => json!({}),
            other => json!({ "type": other.name() }),
        }
    }
}

fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single declared parameter of a tool.
///
/// ```
/// use toolbridge::schema::{Parameter, ValueType};
///
/// let p = Parameter::required("filename", ValueType::String, "Path to the file");
/// assert_eq!(p.name(), "filename");
/// assert!(p.is_required());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    value_type: ValueType,
    description: String,
    required: bool,
}

impl Parameter {
    /// Creates a parameter declaration.
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        Parameter {
            name: name.into(),
            value_type,
            description: description.into(),
            required,
        }
    }

    /// Shorthand for a parameter the caller must supply.
    pub fn required(
        name: impl Into<String>,
        value_type: ValueType,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, value_type, description, true)
    }

    /// Shorthand for a parameter the caller may omit.
    pub fn optional(
        name: impl Into<String>,
        value_type: ValueType,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, value_type, description, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// The ordered parameter list of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputSchema {
    parameters: Vec<Parameter>,
}

impl InputSchema {
    /// Creates a schema from parameters, keeping their declaration order.
    pub fn new<P: IntoIterator<Item = Parameter>>(parameters: P) -> Self {
        InputSchema {
            parameters: parameters.into_iter().collect(),
        }
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Looks up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Returns the first parameter name that is declared more than once.
    pub(crate) fn duplicate_name(&self) -> Option<&str> {
        self.parameters.iter().enumerate().find_map(|(i, p)| {
            self.parameters[..i]
                .iter()
                .any(|earlier| earlier.name == p.name)
                .then_some(p.name.as_str())
        })
    }

    /// Renders the schema as a JSON Schema `object` document.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for parameter in &self.parameters {
            let mut property = match parameter.value_type.json_schema() {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            property.insert(
                "description".to_string(),
                parameter.description.clone().into(),
            );
            properties.insert(parameter.name.clone(), Value::Object(property));
            if parameter.required {
                required.push(Value::from(parameter.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
