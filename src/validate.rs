//! Argument validation against a tool's [`InputSchema`].
//!
//! Validation is a pure function of the supplied arguments and the schema.
//! Declared parameters are checked in declaration order, then any leftover
//! arguments are reported as unexpected; the first problem found is returned.

use crate::error::{Fault, FaultKind};
use crate::schema::{InputSchema, ValueType};
use crate::tools::Arguments;
use serde_json::{Map, Value, json};

/// Why a set of arguments does not fit a schema.
///
/// Every variant names the offending parameter first, as in
/// `b: expected integer, got string`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("{parameter}: missing required parameter (expected {expected})")]
    Missing {
        parameter: String,
        expected: ValueType,
    },
    #[error("{parameter}: unexpected parameter (got {actual})")]
    Unexpected {
        parameter: String,
        actual: &'static str,
    },
    #[error("{parameter}: expected {expected}, got {actual}")]
    WrongType {
        parameter: String,
        expected: ValueType,
        actual: &'static str,
    },
}

impl SchemaMismatch {
    /// The parameter the mismatch is about.
    pub fn parameter(&self) -> &str {
        match self {
            SchemaMismatch::Missing { parameter, .. }
            | SchemaMismatch::Unexpected { parameter, .. }
            | SchemaMismatch::WrongType { parameter, .. } => parameter,
        }
    }
}

impl From<SchemaMismatch> for Fault {
    fn from(mismatch: SchemaMismatch) -> Self {
        let detail = match &mismatch {
            SchemaMismatch::Missing {
                parameter,
                expected,
            } => json!({"parameter": parameter, "expected": expected, "actual": null}),
            SchemaMismatch::Unexpected { parameter, actual } => {
                json!({"parameter": parameter, "expected": null, "actual": actual})
            }
            SchemaMismatch::WrongType {
                parameter,
                expected,
                actual,
            } => json!({"parameter": parameter, "expected": expected, "actual": actual}),
        };
        Fault::new(FaultKind::SchemaMismatch, mismatch.to_string()).with_detail(detail)
    }
}

/// Checks `arguments` against `schema`.
///
/// An optional parameter supplied as `null` is treated as omitted. Integral
/// floats are normalized for integer parameters; nothing else is coerced.
///
/// # Examples
///
/// ```
/// use toolbridge::schema::{InputSchema, Parameter, ValueType};
/// use toolbridge::validate::validate;
/// use serde_json::json;
///
/// let schema = InputSchema::new(vec![
///     Parameter::required("a", ValueType::Integer, ""),
///     Parameter::required("b", ValueType::Integer, ""),
/// ]);
///
/// let ok = json!({"a": 2, "b": 3.0});
/// let args = validate(ok.as_object().unwrap(), &schema).unwrap();
/// assert_eq!(args.raw("b"), Some(&json!(3)));
///
/// let bad = json!({"a": 2, "b": "x"});
/// let err = validate(bad.as_object().unwrap(), &schema).unwrap_err();
/// assert_eq!(err.to_string(), "b: expected integer, got string");
/// ```
///
/// # Errors
///
/// The first [`SchemaMismatch`] found.
pub fn validate(
    arguments: &Map<String, Value>,
    schema: &InputSchema,
) -> Result<Arguments, SchemaMismatch> {
    let mut validated = Map::new();
    for parameter in schema.parameters() {
        let expected = parameter.value_type();
        let supplied = match arguments.get(parameter.name()) {
            Some(Value::Null)
                if !parameter.is_required() && expected.admit(&Value::Null).is_none() =>
            {
                None
            }
            other => other,
        };
        match supplied {
            None if parameter.is_required() => {
                return Err(SchemaMismatch::Missing {
                    parameter: parameter.name().to_string(),
                    expected,
                });
            }
            None => {}
            Some(value) => match expected.admit(value) {
                Some(admitted) => {
                    validated.insert(parameter.name().to_string(), admitted);
                }
                None => {
                    return Err(SchemaMismatch::WrongType {
                        parameter: parameter.name().to_string(),
                        expected,
                        actual: ValueType::of(value),
                    });
                }
            },
        }
    }
    if let Some((name, value)) = arguments
        .iter()
        .find(|(name, _)| schema.parameter(name).is_none())
    {
        return Err(SchemaMismatch::Unexpected {
            parameter: name.clone(),
            actual: ValueType::of(value),
        });
    }
    Ok(Arguments::new(validated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Parameter;

    fn schema() -> InputSchema {
        InputSchema::new(vec![
            Parameter::required("a", ValueType::Integer, ""),
            Parameter::required("b", ValueType::Integer, ""),
            Parameter::optional("label", ValueType::String, ""),
        ])
    }

    fn check(value: Value) -> Result<Arguments, SchemaMismatch> {
        validate(value.as_object().unwrap(), &schema())
    }

    #[test]
    fn missing_required_parameter() {
        let err = check(json!({"a": 1})).unwrap_err();
        assert_eq!(err.parameter(), "b");
        assert_eq!(err.to_string(), "b: missing required parameter (expected integer)");
    }

    #[test]
    fn unexpected_parameter() {
        let err = check(json!({"a": 1, "b": 2, "c": true})).unwrap_err();
        assert_eq!(
            err,
            SchemaMismatch::Unexpected {
                parameter: "c".to_string(),
                actual: "boolean"
            }
        );
    }

    #[test]
    fn fractional_value_for_integer() {
        let err = check(json!({"a": 1.5, "b": 2})).unwrap_err();
        assert_eq!(err.to_string(), "a: expected integer, got number");
    }

    #[test]
    fn declared_order_wins_over_extras() {
        // both `b` and `zzz` are wrong; the declared parameter is reported
        let err = check(json!({"a": 1, "zzz": 0})).unwrap_err();
        assert_eq!(err.parameter(), "b");
    }

    #[test]
    fn optional_null_is_omitted() {
        let args = check(json!({"a": 1, "b": 2, "label": null})).unwrap();
        assert_eq!(args.raw("label"), None);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn required_null_is_a_type_error() {
        let err = check(json!({"a": null, "b": 2})).unwrap_err();
        assert_eq!(err.to_string(), "a: expected integer, got null");
    }

    #[test]
    fn same_input_same_outcome() {
        let input = json!({"a": 1, "b": "x"});
        assert_eq!(check(input.clone()), check(input));
    }

    #[test]
    fn mismatch_becomes_schema_fault() {
        let fault: Fault = check(json!({"a": 1, "b": "x"})).unwrap_err().into();
        assert_eq!(fault.kind, FaultKind::SchemaMismatch);
        assert_eq!(
            fault.detail,
            Some(json!({"parameter": "b", "expected": "integer", "actual": "string"}))
        );
    }
}
