//! Application configuration
//!
//! Loaded once at startup from the environment (and an optional `.env`
//! file). Nothing here changes after the executor is built.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default directory that relative file-tool paths resolve under
const DEFAULT_WORKSPACE_DIR: &str = "./workspace";
/// Default sandbox roots
const DEFAULT_ALLOWED_PATHS: &[&str] = &["./workspace", "./memory", "./sessions"];
/// Default location of the persisted approvals
const DEFAULT_APPROVALS_FILE: &str = "./sessions/command-approvals.json";
/// Default shell timeout in milliseconds
const DEFAULT_SHELL_TIMEOUT_MS: u64 = 30_000;

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Runtime configuration for the tool executor and CLI
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root that relative file-tool paths are joined onto
    pub workspace_dir: PathBuf,

    /// Sandbox root set
    pub allowed_paths: Vec<PathBuf>,

    /// Approval store file
    pub approvals_file: PathBuf,

    /// Default shell timeout when a call does not pass one
    pub shell_timeout_ms: u64,

    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Text or JSON log lines
    pub log_format: LogFormat,

    /// Optional directory for a daily rolling log file
    pub log_dir: Option<PathBuf>,

    /// Print every tool call with its arguments, result preview and duration
    pub show_tools: bool,

    /// Print results as JSON envelopes
    pub json_output: bool,

    /// Set once the roots come from `ALLOWED_PATHS` or `with_allowed_paths`;
    /// until then they follow the workspace
    explicit_roots: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from(DEFAULT_WORKSPACE_DIR),
            allowed_paths: DEFAULT_ALLOWED_PATHS.iter().map(PathBuf::from).collect(),
            approvals_file: PathBuf::from(DEFAULT_APPROVALS_FILE),
            shell_timeout_ms: DEFAULT_SHELL_TIMEOUT_MS,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_dir: None,
            show_tools: true,
            json_output: false,
            explicit_roots: false,
        }
    }
}

impl AppConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment
    ///
    /// A `.env` file in the current directory is read first if present.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = get("WORKSPACE_DIR") {
            config = config.with_workspace_dir(dir.trim());
        }

        if let Some(paths) = get("ALLOWED_PATHS") {
            config = config.with_allowed_paths(split_paths(&paths));
        }

        if let Some(file) = get("APPROVALS_FILE") {
            config.approvals_file = PathBuf::from(file.trim());
        }

        if let Some(timeout) = get("SHELL_TIMEOUT") {
            config.shell_timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("SHELL_TIMEOUT must be milliseconds, got '{}'", timeout))?;
        }

        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level.trim().to_string();
        }

        if let Some(format) = get("LOG_FORMAT") {
            config.log_format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "pretty" => LogFormat::Text,
                other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
            };
        }

        if let Some(dir) = get("LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir.trim()));
        }

        if let Some(flag) = get("SHOW_TOOLS") {
            config.show_tools = flag.trim() != "false";
        }

        if let Some(flag) = get("JSON_OUTPUT") {
            config.json_output = flag.trim() == "true";
        }

        Ok(config)
    }

    /// Set the workspace directory
    ///
    /// Unless roots were set explicitly, the workspace becomes the only
    /// sandbox root.
    pub fn with_workspace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace_dir = dir.into();
        if !self.explicit_roots {
            self.allowed_paths = vec![self.workspace_dir.clone()];
        }
        self
    }

    /// Replace the sandbox root set
    pub fn with_allowed_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.allowed_paths = paths.into_iter().map(Into::into).collect();
        self.explicit_roots = true;
        self
    }

    /// Set the approval store file
    pub fn with_approvals_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.approvals_file = file.into();
        self
    }

    /// Set the default shell timeout in milliseconds
    pub fn with_shell_timeout(mut self, timeout_ms: u64) -> Self {
        self.shell_timeout_ms = timeout_ms;
        self
    }

    /// Set whether tool calls are echoed to the terminal
    pub fn with_show_tools(mut self, show: bool) -> Self {
        self.show_tools = show;
        self
    }

    /// Set whether results are printed as JSON
    pub fn with_json_output(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }

    /// Default shell timeout as Duration
    pub fn shell_timeout(&self) -> Duration {
        Duration::from_millis(self.shell_timeout_ms)
    }
}

fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}
