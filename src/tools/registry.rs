//! Tool registry for managing available tools
//!
//! The registry holds every tool the executor can dispatch to. Tools are
//! registered once at startup and never change afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::tool::{Tool, ToolDescriptor};
use crate::core::{ToolError, ToolResult};

/// Registry that holds all available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    ///
    /// A tool needs a non-empty name and description. Registering a name
    /// twice replaces the earlier tool.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> ToolResult<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register an already shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> ToolResult<()> {
        let name = tool.name().trim().to_string();
        if name.is_empty() || tool.description().trim().is_empty() {
            return Err(ToolError::InvalidArgument(
                "a tool needs both a name and a description".to_string(),
            ));
        }

        tracing::info!("Registering tool: {}", name);
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool '{}' was already registered and has been replaced", name);
        }
        Ok(())
    }

    /// Register several tools at once
    pub fn register_all<I>(&mut self, tools: I) -> ToolResult<()>
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        for tool in tools {
            self.register_arc(tool)?;
        }
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check whether a tool is registered
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors of every tool, sorted by name
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<_> = self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Function-calling entries for every tool
    pub fn to_api_format(&self) -> Vec<Value> {
        self.descriptors()
            .iter()
            .map(ToolDescriptor::to_api_format)
            .collect()
    }

    /// Get the list of tool names, sorted
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
