//! Tool call error types

use thiserror::Error;

/// Broad category of a tool call failure
///
/// Everything except `ExecutionFailure` (and `Persistence`, which never
/// reaches the caller) is detected before any side effect happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown tool, missing file or directory
    NotFound,
    /// Missing required parameter or malformed argument
    Validation,
    /// Path outside the sandbox
    AccessDenied,
    /// Black-tier command, or gray-tier without confirmation
    PolicyRefused,
    /// Handler failed, process exited non-zero or timed out
    ExecutionFailure,
    /// Approval file unreadable or unwritable
    Persistence,
}

/// Errors that can occur while dispatching a tool call
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool registered under this name
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Target file or directory does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A required parameter is absent from the arguments
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// An argument is present but unusable
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Path resolves outside every sandbox root
    #[error("path access denied: {0}")]
    AccessDenied(String),

    /// Command is on the black list
    #[error("command refused by policy: {0}")]
    Blacklisted(String),

    /// Gray-tier command without a cached approval or confirmation flag
    #[error("confirmation required for `{0}`: pass approval=once or approval=remember_7d")]
    ConfirmationRequired(String),

    /// Shell command exited non-zero, ran past its deadline, or was stopped
    /// for writing more output than is captured
    #[error("{}", describe_command_failure(.command, .exit_code, .timed_out, .output_exceeded, .stderr))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        timed_out: bool,
        output_exceeded: bool,
        stdout: String,
        stderr: String,
    },

    /// Wrapper for any failure raised from inside a handler
    #[error("tool \"{tool}\" execution failed: {source}")]
    ExecutionFailed {
        tool: String,
        #[source]
        source: Box<ToolError>,
    },

    /// Approval store could not be read or written
    #[error("approval store error: {0}")]
    Persistence(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

fn describe_command_failure(
    command: &str,
    exit_code: &Option<i32>,
    timed_out: &bool,
    output_exceeded: &bool,
    stderr: &str,
) -> String {
    let mut message = if *timed_out {
        format!("command `{}` timed out", command)
    } else if *output_exceeded {
        format!("command `{}` was stopped after exceeding the output limit", command)
    } else {
        match exit_code {
            Some(code) => format!("command `{}` exited with code {}", command, code),
            None => format!("command `{}` was terminated by a signal", command),
        }
    };
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        message.push_str(": ");
        message.push_str(stderr);
    }
    message
}

impl ToolError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        ToolError::Other(msg.into())
    }

    /// Wrap a handler failure with the tool name
    pub fn execution_failed(tool: impl Into<String>, source: ToolError) -> Self {
        ToolError::ExecutionFailed {
            tool: tool.into(),
            source: Box::new(source),
        }
    }

    /// Category of this error
    ///
    /// A wrapped handler failure reports the category of what it wraps, so a
    /// missing file stays `NotFound` after the executor adds the tool name.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::ToolNotFound(_) | ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::MissingParameter(_) | ToolError::InvalidArgument(_) => {
                ErrorKind::Validation
            }
            ToolError::AccessDenied(_) => ErrorKind::AccessDenied,
            ToolError::Blacklisted(_) | ToolError::ConfirmationRequired(_) => {
                ErrorKind::PolicyRefused
            }
            ToolError::Persistence(_) => ErrorKind::Persistence,
            ToolError::ExecutionFailed { source, .. } => source.kind(),
            ToolError::CommandFailed { .. }
            | ToolError::Io(_)
            | ToolError::Serialization(_)
            | ToolError::Other(_) => ErrorKind::ExecutionFailure,
        }
    }

    /// Captured `(stdout, stderr)` of a failed shell command, looking through wrappers
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            ToolError::CommandFailed { stdout, stderr, .. } => Some((stdout, stderr)),
            ToolError::ExecutionFailed { source, .. } => source.captured_output(),
            _ => None,
        }
    }
}

/// Result type alias for tool operations
pub type ToolResult<T> = Result<T, ToolError>;
