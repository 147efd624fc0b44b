//! Argument validation
//!
//! Pure functions that turn a raw JSON argument blob into validated
//! [`Arguments`] or a `BAD_ARGUMENT` [`ToolError`]. No I/O happens here:
//! path confinement is the workspace guard's job, not the validator's.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use super::schema::{ParamKind, ParamSpec, Schema};
use super::value_objects::ToolError;

/// Validated arguments, keyed by parameter name.
///
/// Every required parameter of the schema is present and every present value
/// satisfies its declared kind. Coerced values (numeric strings, `"true"`)
/// are stored in their canonical JSON form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Arguments {
    values: BTreeMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// String argument that the schema guarantees to be present.
    ///
    /// Still fallible so tools can be exercised with hand-built arguments.
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.get_str(name)
            .ok_or_else(|| ToolError::bad_argument(format!("{}: missing required parameter", name)))
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    /// Non-negative integral number argument.
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        let value = self.values.get(name)?;
        value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        })
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}

/// Validate a raw argument blob against a schema.
///
/// `null` is accepted as "no arguments". Missing optional parameters (or ones
/// given as explicit `null`) get their default, and the default is validated
/// like any caller-supplied value.
pub fn validate_arguments(schema: &Schema, raw: &Value) -> Result<Arguments, ToolError> {
    let empty = Map::new();
    let supplied = match raw {
        Value::Null => &empty,
        Value::Object(map) => map,
        _ => return Err(ToolError::bad_argument("arguments: expected an object")),
    };

    if let Some(unknown) = supplied.keys().find(|key| schema.get(key).is_none()) {
        return Err(ToolError::bad_argument(format!(
            "{}: unknown parameter",
            unknown
        )));
    }

    let mut values = BTreeMap::new();
    for spec in schema.params() {
        let given = supplied.get(&spec.name).filter(|v| !v.is_null());
        let value = match (given, &spec.default) {
            (Some(value), _) => value,
            (None, Some(default)) => default,
            (None, None) if spec.required => {
                return Err(ToolError::bad_argument(format!(
                    "{}: missing required parameter",
                    spec.name
                )));
            }
            (None, None) => continue,
        };

        let checked = check_value(spec, value)
            .map_err(|why| ToolError::bad_argument(format!("{}: {}", spec.name, why)))?;
        values.insert(spec.name.clone(), checked);
    }

    Ok(Arguments { values })
}

fn check_value(spec: &ParamSpec, value: &Value) -> Result<Value, String> {
    match spec.kind {
        ParamKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(format!("expected a string, got {}", type_name(other))),
        },
        ParamKind::Path => match value {
            Value::String(s) if s.trim().is_empty() => Err("path must not be empty".to_string()),
            Value::String(_) => Ok(value.clone()),
            other => Err(format!("expected a path string, got {}", type_name(other))),
        },
        ParamKind::Url => match value {
            Value::String(s) => check_url(s).map(|_| value.clone()),
            other => Err(format!("expected a URL string, got {}", type_name(other))),
        },
        ParamKind::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => coerce_number(s),
            other => Err(format!("expected a number, got {}", type_name(other))),
        },
        ParamKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            other => Err(format!("expected a boolean, got {}", type_name(other))),
        },
    }
}

fn check_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("invalid URL ({})", e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported URL scheme '{}'", other)),
    }
}

fn coerce_number(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(Value::Number(int.into()));
    }
    let float: f64 = trimmed
        .parse()
        .map_err(|_| format!("expected a number, got string '{}'", raw))?;
    Number::from_f64(float)
        .map(Value::Number)
        .ok_or_else(|| "number must be finite".to_string())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validator for tool arguments
///
/// This is a pure domain trait so that the dispatcher can be handed a
/// different validation strategy in tests.
pub trait ArgumentValidator: Send + Sync {
    /// Validate raw arguments against a schema
    fn validate(&self, schema: &Schema, raw: &Value) -> Result<Arguments, ToolError>;
}

/// Default implementation: strict, rejects unknown keys.
#[derive(Debug, Clone, Default)]
pub struct StrictValidator;

impl ArgumentValidator for StrictValidator {
    fn validate(&self, schema: &Schema, raw: &Value) -> Result<Arguments, ToolError> {
        validate_arguments(schema, raw)
    }
}
