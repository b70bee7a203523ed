//! Tool system
//!
//! This module provides:
//! - `Tool` trait - Interface for implementing tools
//! - `ParameterSchema` - Declared parameters and presence validation
//! - `ToolRegistry` - Registry for managing available tools
//! - `ToolExecutor` - The gated pipeline every call goes through
//! - `common` - Built-in tools (read_file, write_file, list_directory, exec_shell, get_current_time)

mod executor;
mod registry;
mod schema;
mod tool;

/// Common/built-in tools
pub mod common;

// Core exports
pub use executor::ToolExecutor;
pub use registry::ToolRegistry;
pub use schema::{ParameterSchema, ParameterSpec, ParameterType};
pub use tool::{Tool, ToolContext, ToolDescriptor, ToolKind};

// Re-export common tools for convenience
pub use common::{
    builtin_tools, CurrentTimeTool, ExecShellTool, ListDirectoryTool, ReadFileTool, WriteFileTool,
};
