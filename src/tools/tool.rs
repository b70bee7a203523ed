//! Tool trait definition
//!
//! All tools implement this trait to provide a consistent interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::schema::ParameterSchema;
use crate::core::{ToolError, ToolResult};

/// Which gate the executor applies before calling a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Takes a `path` argument that must resolve inside the sandbox
    Filesystem,
    /// Runs a command that must pass the shell guard and the classifier
    Shell,
    /// No gate (clock and similar)
    Utility,
}

/// What the executor has already checked on behalf of the handler
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Sandboxed absolute target for filesystem tools
    pub path: Option<PathBuf>,

    /// Normalized, policy-approved command for the shell tool
    pub command: Option<String>,

    /// Directory the shell tool runs in
    pub working_dir: PathBuf,

    /// Shell timeout when the call passes none
    pub default_timeout: Duration,
}

impl ToolContext {
    /// Context with no gate results
    pub fn new(working_dir: impl Into<PathBuf>, default_timeout: Duration) -> Self {
        Self {
            path: None,
            command: None,
            working_dir: working_dir.into(),
            default_timeout,
        }
    }

    /// The sandboxed target path
    pub fn target_path(&self) -> ToolResult<&Path> {
        self.path
            .as_deref()
            .ok_or_else(|| ToolError::other("no sandboxed path was resolved for this call"))
    }

    /// The approved command
    pub fn approved_command(&self) -> ToolResult<&str> {
        self.command
            .as_deref()
            .ok_or_else(|| ToolError::other("no approved command for this call"))
    }
}

/// Name, description and schema advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDescriptor {
    /// OpenAI-style function-calling entry
    pub fn to_api_format(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Trait for tools that the agent can use
///
/// Handlers never run on their own: the executor validates arguments and
/// applies the sandbox or shell policy first, then passes the results in
/// the [`ToolContext`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of this tool
    fn name(&self) -> &str;

    /// Get a description of this tool
    fn description(&self) -> &str;

    /// Get the parameter schema
    fn schema(&self) -> ParameterSchema;

    /// Which gate applies to this tool
    fn kind(&self) -> ToolKind {
        ToolKind::Utility
    }

    /// Execute the tool with validated arguments
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult<Value>;

    /// Descriptor for advertising this tool
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema(),
        }
    }
}

/// Read an optional string argument
pub(crate) fn optional_str<'a>(args: &'a Value, name: &str) -> ToolResult<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ToolError::InvalidArgument(format!(
            "parameter '{}' must be a string",
            name
        ))),
    }
}

/// Read a required string argument
pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> ToolResult<&'a str> {
    optional_str(args, name)?.ok_or_else(|| ToolError::MissingParameter(name.to_string()))
}
