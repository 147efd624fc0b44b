//! Declarative argument schemas.
//!
//! A [`Schema`] is an ordered list of [`ParamSpec`]s. Schemas are plain
//! value objects: they carry no behavior beyond being compared and handed to
//! the validator in [`super::validation`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Any JSON string
    String,
    /// Finite integral or fractional number
    Number,
    /// `true` / `false`
    Boolean,
    /// Non-empty filesystem path (confinement happens in the workspace guard)
    Path,
    /// Absolute `http`/`https` URL
    Url,
}

impl ParamKind {
    pub fn as_str(&self) -> &str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Path => "path",
            ParamKind::Url => "url",
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Specification of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Accepted value kind
    pub kind: ParamKind,
    /// Whether the caller must supply this parameter
    pub required: bool,
    /// Value applied when an optional parameter is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human-readable description (surfaced to the LLM)
    pub description: String,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            description: description.into(),
        }
    }

    /// Shorthand for a required parameter.
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self::new(name, kind, description).mark_required()
    }

    pub fn mark_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Ordered mapping from parameter name to [`ParamSpec`].
///
/// Insertion order is preserved so that listings shown to the agent are
/// stable. Re-adding a name replaces the earlier spec in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    params: Vec<ParamSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn required(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
