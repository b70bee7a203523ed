//! Parameter schemas for tools
//!
//! A schema lists each parameter with a type tag, description and optional
//! default, plus the names that must be present. Validation is a presence
//! check only; types and defaults are the handler's business.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::{ToolError, ToolResult};

/// JSON type tag of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Type tag
    #[serde(rename = "type")]
    pub param_type: ParameterType,

    /// Human-readable description shown to the model
    pub description: String,

    /// Default the handler applies when the parameter is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    /// Create a parameter spec
    pub fn new(param_type: ParameterType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            default: None,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// JSON-schema style description of a tool's arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Type (always "object")
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Declared parameters by name
    pub properties: BTreeMap<String, ParameterSpec>,

    /// Names that must be present
    pub required: Vec<String>,
}

impl ParameterSchema {
    /// Create an empty object schema
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Declare an optional parameter
    pub fn optional(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Declare a required parameter
    pub fn required(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, spec);
        self
    }

    /// Declared default for `name`, if any
    pub fn default_for(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).and_then(|spec| spec.default.as_ref())
    }

    /// Check that `args` is an object carrying every required name
    ///
    /// A key that is present with a `null` value counts as present.
    pub fn validate(&self, args: &Value) -> ToolResult<()> {
        let object = match args {
            Value::Object(object) => object,
            Value::Null if self.required.is_empty() => return Ok(()),
            Value::Null => {
                return Err(ToolError::MissingParameter(self.required[0].clone()));
            }
            other => {
                return Err(ToolError::InvalidArgument(format!(
                    "arguments must be a JSON object, got {}",
                    json_type_name(other)
                )));
            }
        };

        match self.required.iter().find(|name| !object.contains_key(*name)) {
            Some(missing) => Err(ToolError::MissingParameter(missing.clone())),
            None => Ok(()),
        }
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::new()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
