//! Shell tool for executing commands
//!
//! The command reaching this handler has already passed the shell guard
//! and the classifier. It is spawned directly from its tokens (no `sh -c`)
//! with a hard wall-clock timeout; a command that overruns is killed.
//! Each pipe is buffered up to 1 MiB and a command that writes more is
//! killed as well.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Notify;
use tokio::time::timeout;

use crate::core::{ToolError, ToolResult};
use crate::tools::schema::{ParameterSchema, ParameterSpec, ParameterType};
use crate::tools::tool::{Tool, ToolContext, ToolKind};

/// Maximum timeout in milliseconds (10 minutes)
const MAX_TIMEOUT_MS: u64 = 600_000;
/// How long to keep reading pipes once the process is gone
const OUTPUT_DRAIN: Duration = Duration::from_secs(2);
/// Maximum length of each stream in the result
const MAX_OUTPUT_LENGTH: usize = 30_000;
/// Bytes buffered per stream before the command is stopped (1 MiB)
const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Shell tool for executing policy-checked commands
pub struct ExecShellTool;

/// What a finished (or killed) process left behind
struct CapturedRun {
    exit_code: Option<i32>,
    success: bool,
    timed_out: bool,
    output_exceeded: bool,
    stdout: String,
    stderr: String,
}

impl ExecShellTool {
    /// Resolve the effective timeout from the `timeout` argument
    fn timeout_for(args: &Value, default: Duration) -> ToolResult<Duration> {
        let ms = match args.get("timeout") {
            None | Some(Value::Null) => {
                return Ok(default.min(Duration::from_millis(MAX_TIMEOUT_MS)));
            }
            // zero means "use the default"
            Some(value) if value.as_f64() == Some(0.0) => {
                return Ok(default.min(Duration::from_millis(MAX_TIMEOUT_MS)));
            }
            Some(value) => value
                .as_u64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as u64)
                })
                .ok_or_else(|| {
                    ToolError::InvalidArgument(
                        "timeout must be a non-negative number of milliseconds".to_string(),
                    )
                })?,
        };
        Ok(Duration::from_millis(ms.clamp(1, MAX_TIMEOUT_MS)))
    }

    /// Spawn the command and wait for it, killing it at the deadline
    async fn run_command(
        command: &str,
        ctx: &ToolContext,
        limit: Duration,
    ) -> ToolResult<CapturedRun> {
        let mut tokens = command.split(' ');
        let program = tokens
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ToolError::InvalidArgument("command must not be empty".to_string()))?;

        tracing::info!("Executing shell command: {}", command);
        tracing::debug!("Working directory: {}", ctx.working_dir.display());
        tracing::debug!("Timeout: {}ms", limit.as_millis());

        let mut child = Command::new(program)
            .args(tokens)
            .current_dir(&ctx.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::other(format!("failed to start `{}`: {}", program, e)))?;

        let overflow = Arc::new(Notify::new());
        let stdout_task = tokio::spawn(read_capped(child.stdout.take(), overflow.clone()));
        let stderr_task = tokio::spawn(read_capped(child.stderr.take(), overflow.clone()));

        let waited = timeout(limit, async {
            // a capped reader closes its pipe, so the child may die of SIGPIPE
            tokio::select! {
                biased;
                _ = overflow.notified() => None,
                status = child.wait() => Some(status),
            }
        })
        .await;

        let (status, timed_out, output_exceeded) = match waited {
            Ok(Some(status)) => (Some(status?), false, false),
            Ok(None) => {
                tracing::warn!(
                    "Command `{}` wrote more than {} bytes, killing it",
                    command,
                    MAX_CAPTURE_BYTES
                );
                (None, false, true)
            }
            Err(_) => {
                tracing::warn!(
                    "Command `{}` exceeded {}ms, killing it",
                    command,
                    limit.as_millis()
                );
                (None, true, false)
            }
        };
        if status.is_none() {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill `{}`: {}", command, e);
            }
        }

        // A grandchild can keep a pipe open after the kill; stop waiting on it.
        let stdout = timeout(OUTPUT_DRAIN, stdout_task)
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();
        let stderr = timeout(OUTPUT_DRAIN, stderr_task)
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();

        let run = CapturedRun {
            exit_code: status.and_then(|s| s.code()),
            success: status.is_some_and(|s| s.success()),
            timed_out,
            output_exceeded,
            stdout: truncate_output(String::from_utf8_lossy(&stdout).into_owned()),
            stderr: truncate_output(String::from_utf8_lossy(&stderr).into_owned()),
        };

        tracing::debug!("Command exit code: {:?}", run.exit_code);
        tracing::debug!(
            "Output length: {} + {} chars",
            run.stdout.len(),
            run.stderr.len()
        );

        Ok(run)
    }
}

#[async_trait]
impl Tool for ExecShellTool {
    fn name(&self) -> &str {
        "exec_shell"
    }

    fn description(&self) -> &str {
        "Run a shell command. Read-only commands run directly, toolchain and package-manager \
         commands need approval=once or approval=remember_7d, destructive commands are refused. \
         Pipes, redirection, chaining and substitution are not supported."
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required(
                "command",
                ParameterSpec::new(ParameterType::String, "The command to execute"),
            )
            .optional(
                "approval",
                ParameterSpec::new(
                    ParameterType::String,
                    "Confirmation for commands that need it: once or remember_7d",
                ),
            )
            .optional(
                "timeout",
                ParameterSpec::new(ParameterType::Number, "Timeout in milliseconds")
                    .with_default(30_000),
            )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Shell
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult<Value> {
        let command = ctx.approved_command()?;
        let limit = Self::timeout_for(args, ctx.default_timeout)?;

        let run = Self::run_command(command, ctx, limit).await?;

        if !run.success {
            return Err(ToolError::CommandFailed {
                command: command.to_string(),
                exit_code: run.exit_code,
                timed_out: run.timed_out,
                output_exceeded: run.output_exceeded,
                stdout: run.stdout,
                stderr: run.stderr,
            });
        }

        let stderr = if run.stderr.is_empty() {
            Value::Null
        } else {
            Value::String(run.stderr)
        };

        Ok(json!({
            "stdout": run.stdout,
            "stderr": stderr,
            "exitCode": 0,
        }))
    }
}

/// Read a pipe up to [`MAX_CAPTURE_BYTES`]; signal `overflow` if there was more
async fn read_capped<R: AsyncRead + Unpin>(stream: Option<R>, overflow: Arc<Notify>) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(stream) = stream else {
        return buf;
    };

    let mut limited = stream.take(MAX_CAPTURE_BYTES as u64 + 1);
    if let Err(e) = limited.read_to_end(&mut buf).await {
        tracing::debug!("Stopped reading command output: {}", e);
    }
    if buf.len() > MAX_CAPTURE_BYTES {
        buf.truncate(MAX_CAPTURE_BYTES);
        overflow.notify_one();
    }
    buf
}

fn truncate_output(mut output: String) -> String {
    if output.len() > MAX_OUTPUT_LENGTH {
        let mut cut = MAX_OUTPUT_LENGTH;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("\n... (output truncated)");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx_for(command: &str, dir: &std::path::Path) -> ToolContext {
        let mut ctx = ToolContext::new(dir, Duration::from_secs(10));
        ctx.command = Some(command.to_string());
        ctx
    }

    #[tokio::test]
    async fn test_echo() {
        let temp = TempDir::new().unwrap();
        let result = ExecShellTool
            .execute(&json!({"command": "echo hello"}), &ctx_for("echo hello", temp.path()))
            .await
            .unwrap();

        assert_eq!(result["stdout"], "hello\n");
        assert_eq!(result["stderr"], Value::Null);
        assert_eq!(result["exitCode"], 0);
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "").unwrap();

        let result = ExecShellTool
            .execute(&json!({"command": "ls"}), &ctx_for("ls", temp.path()))
            .await
            .unwrap();
        assert!(result["stdout"].as_str().unwrap().contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_stderr() {
        let temp = TempDir::new().unwrap();
        let err = ExecShellTool
            .execute(
                &json!({"command": "ls does-not-exist"}),
                &ctx_for("ls does-not-exist", temp.path()),
            )
            .await
            .unwrap_err();

        match err {
            ToolError::CommandFailed {
                exit_code,
                timed_out,
                stderr,
                ..
            } => {
                assert!(!timed_out);
                assert_ne!(exit_code, Some(0));
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let temp = TempDir::new().unwrap();
        let started = std::time::Instant::now();
        let err = ExecShellTool
            .execute(
                &json!({"command": "sleep 5", "timeout": 200}),
                &ctx_for("sleep 5", temp.path()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::CommandFailed { timed_out: true, .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_runaway_output_is_stopped() {
        let temp = TempDir::new().unwrap();
        let command = "head -c 400000000 /dev/zero";
        let started = std::time::Instant::now();
        let err = ExecShellTool
            .execute(&json!({"command": command}), &ctx_for(command, temp.path()))
            .await
            .unwrap_err();

        match err {
            ToolError::CommandFailed {
                output_exceeded,
                timed_out,
                stdout,
                ..
            } => {
                assert!(output_exceeded);
                assert!(!timed_out);
                assert!(stdout.len() <= MAX_OUTPUT_LENGTH + 30);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_output_under_cap_is_kept() {
        let temp = TempDir::new().unwrap();
        let command = "head -c 200000 /dev/zero";
        let result = ExecShellTool
            .execute(&json!({"command": command}), &ctx_for(command, temp.path()))
            .await
            .unwrap();
        assert!(result["stdout"].as_str().unwrap().ends_with("(output truncated)"));
    }

    #[tokio::test]
    async fn test_unknown_program() {
        let temp = TempDir::new().unwrap();
        let err = ExecShellTool
            .execute(
                &json!({"command": "definitely-not-a-binary-xyz"}),
                &ctx_for("definitely-not-a-binary-xyz", temp.path()),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn test_timeout_argument() {
        let default = Duration::from_millis(30_000);
        assert_eq!(ExecShellTool::timeout_for(&json!({}), default).unwrap(), default);
        assert_eq!(
            ExecShellTool::timeout_for(&json!({"timeout": 1500}), default).unwrap(),
            Duration::from_millis(1500)
        );
        assert_eq!(
            ExecShellTool::timeout_for(&json!({"timeout": 10_000_000}), default).unwrap(),
            Duration::from_millis(MAX_TIMEOUT_MS)
        );
        assert_eq!(
            ExecShellTool::timeout_for(&json!({"timeout": 0}), default).unwrap(),
            default
        );
        assert!(ExecShellTool::timeout_for(&json!({"timeout": "soon"}), default).is_err());
        assert!(ExecShellTool::timeout_for(&json!({"timeout": -5}), default).is_err());
    }

    #[test]
    fn test_truncate_output() {
        let long = "é".repeat(MAX_OUTPUT_LENGTH);
        let truncated = truncate_output(long);
        assert!(truncated.ends_with("(output truncated)"));
        assert!(truncated.len() <= MAX_OUTPUT_LENGTH + 30);
    }
}
