//! Common/built-in tools
//!
//! These are the tools every agent gets:
//! - `ReadFileTool` - Read a file inside the workspace
//! - `WriteFileTool` - Create or overwrite a file inside the workspace
//! - `ListDirectoryTool` - List a directory inside the workspace
//! - `ExecShellTool` - Run a policy-checked shell command
//! - `CurrentTimeTool` - Report the current date and time

pub mod list_tool;
pub mod read_tool;
pub mod shell_tool;
pub mod time_tool;
pub mod write_tool;

use std::sync::Arc;

pub use list_tool::ListDirectoryTool;
pub use read_tool::ReadFileTool;
pub use shell_tool::ExecShellTool;
pub use time_tool::CurrentTimeTool;
pub use write_tool::WriteFileTool;

use super::tool::Tool;
use crate::core::{ToolError, ToolResult};

/// Every built-in tool
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(ListDirectoryTool),
        Arc::new(ExecShellTool),
        Arc::new(CurrentTimeTool),
    ]
}

/// Text encoding accepted by the file tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileEncoding {
    Utf8,
    Base64,
}

impl FileEncoding {
    /// Parse the `encoding` argument, defaulting to UTF-8
    pub(crate) fn parse(raw: Option<&str>) -> ToolResult<Self> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("utf-8") | Some("utf8") => Ok(FileEncoding::Utf8),
            Some("base64") => Ok(FileEncoding::Base64),
            Some(other) => Err(ToolError::InvalidArgument(format!(
                "unsupported encoding '{}' (expected utf-8 or base64)",
                other
            ))),
        }
    }
}
