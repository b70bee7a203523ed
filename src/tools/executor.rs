//! Tool execution pipeline
//!
//! [`ToolExecutor::call`] is the only way a handler runs. Each call passes
//! through lookup, parameter validation, then the gate for the tool's
//! [`ToolKind`], and only then reaches the handler. Everything refused
//! before the handler has no side effect.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::common::builtin_tools;
use super::registry::ToolRegistry;
use super::tool::{optional_str, Tool, ToolContext, ToolDescriptor, ToolKind};
use crate::core::{AppConfig, ToolError, ToolResult};
use crate::permissions::{
    approval_signature, check_command, classify, ApprovalCache, ApprovalMode, ApprovalStore,
    RiskTier,
};
use crate::sandbox::{resolve, PathSandbox};

/// Dispatches tool calls through the policy gates
pub struct ToolExecutor {
    registry: ToolRegistry,
    sandbox: PathSandbox,
    approvals: Arc<dyn ApprovalCache>,
    /// The approval file; file tools may never touch it
    approvals_file: PathBuf,
    /// Absolute directory relative file paths are joined onto
    workspace_dir: PathBuf,
    /// Directory shell commands run in; part of every approval signature
    working_dir: PathBuf,
    default_timeout: Duration,
}

impl ToolExecutor {
    /// Build an executor with every built-in tool registered
    pub fn new(config: &AppConfig) -> ToolResult<Self> {
        let mut registry = ToolRegistry::new();
        registry.register_all(builtin_tools())?;
        Self::with_registry(config, registry)
    }

    /// Build an executor around an existing registry
    pub fn with_registry(config: &AppConfig, registry: ToolRegistry) -> ToolResult<Self> {
        let cwd = std::env::current_dir()?;
        let approvals_file = resolve(&cwd, &config.approvals_file);
        let executor = Self {
            registry,
            sandbox: PathSandbox::with_base(&cwd, &config.allowed_paths),
            approvals: Arc::new(ApprovalStore::new(&approvals_file)),
            approvals_file,
            workspace_dir: resolve(&cwd, &config.workspace_dir),
            working_dir: cwd,
            default_timeout: config.shell_timeout(),
        };

        tracing::debug!("Workspace: {}", executor.workspace_dir.display());
        tracing::debug!("Sandbox roots: {:?}", executor.sandbox.roots());
        Ok(executor)
    }

    /// Replace the approval cache
    pub fn with_approvals(mut self, approvals: Arc<dyn ApprovalCache>) -> Self {
        self.approvals = approvals;
        self
    }

    /// Replace the sandbox root set
    pub fn with_sandbox(mut self, sandbox: PathSandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Run shell commands from `dir` instead of the process directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// The registered tools
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Name, description and schema of every tool, sorted by name
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    /// Function-calling entries for every tool
    pub fn to_api_format(&self) -> Vec<Value> {
        self.registry.to_api_format()
    }

    /// Absolute workspace directory
    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Directory shell commands run in
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The sandbox applied to file tools
    pub fn sandbox(&self) -> &PathSandbox {
        &self.sandbox
    }

    /// Run one tool call through the whole pipeline
    pub async fn call(&self, name: &str, args: &Value) -> ToolResult<Value> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;

        let schema = tool.schema();
        schema.validate(args)?;

        let mut ctx = ToolContext::new(&self.working_dir, self.default_timeout);
        match tool.kind() {
            ToolKind::Filesystem => {
                ctx.path = Some(self.sandboxed_path(tool.as_ref(), args)?);
            }
            ToolKind::Shell => {
                ctx.command = Some(self.authorize_command(args).await?);
            }
            ToolKind::Utility => {}
        }

        tracing::info!("Calling tool: {}", name);
        let started = Instant::now();
        let result = tool
            .execute(args, &ctx)
            .await
            .map_err(|e| ToolError::execution_failed(name, e));

        match &result {
            Ok(_) => tracing::debug!("Tool {} finished in {:?}", name, started.elapsed()),
            Err(e) => tracing::warn!("{}", e),
        }
        result
    }

    /// Resolve the `path` argument and check it against the sandbox
    fn sandboxed_path(&self, tool: &dyn Tool, args: &Value) -> ToolResult<PathBuf> {
        let default = tool.schema().default_for("path").cloned();
        let raw = match optional_str(args, "path")? {
            Some(path) => path.to_string(),
            None => default
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or(".")
                .to_string(),
        };

        let path = resolve(&self.workspace_dir, Path::new(&raw));
        if !self.sandbox.is_allowed_from(&self.workspace_dir, &path) {
            tracing::warn!("Refused path outside the sandbox: {}", path.display());
            return Err(ToolError::AccessDenied(raw));
        }
        // a forged record would turn any gray command into a cached grant
        if path == self.approvals_file {
            tracing::warn!("Refused file tool access to the approval store");
            return Err(ToolError::AccessDenied(raw));
        }
        Ok(path)
    }

    /// Apply the shell guard, the classifier and the approval protocol
    ///
    /// Returns the normalized command the handler may run.
    async fn authorize_command(&self, args: &Value) -> ToolResult<String> {
        let raw = optional_str(args, "command")?
            .ok_or_else(|| ToolError::MissingParameter("command".to_string()))?;
        let command = check_command(raw)?;

        match classify(&command) {
            RiskTier::Black => {
                tracing::warn!("Refused black-listed command `{}`", command);
                Err(ToolError::Blacklisted(command))
            }
            RiskTier::Gray => {
                let mode = optional_str(args, "approval")?.and_then(ApprovalMode::parse);
                self.confirm_gray(command, mode).await
            }
            RiskTier::Green | RiskTier::White => Ok(command),
        }
    }

    async fn confirm_gray(&self, command: String, mode: Option<ApprovalMode>) -> ToolResult<String> {
        let signature = approval_signature(&self.working_dir, &command);

        if let Some(record) = self.approvals.lookup(&signature).await {
            tracing::debug!(
                "Using cached approval for `{}` (expires {:?})",
                command,
                record.expires_at_utc()
            );
            return Ok(command);
        }

        match mode {
            Some(ApprovalMode::Remember) => {
                if let Err(e) = self.approvals.grant(&signature).await {
                    tracing::warn!("Could not remember approval for `{}`: {}", command, e);
                }
                Ok(command)
            }
            Some(ApprovalMode::Once) => {
                tracing::info!("Running `{}` with one-time approval", command);
                Ok(command)
            }
            None => Err(ToolError::ConfirmationRequired(command)),
        }
    }
}
