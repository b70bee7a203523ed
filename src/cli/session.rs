//! Interactive and scripted tool sessions
//!
//! Every call made from the console goes through [`ToolSession::invoke`],
//! which traces the call (name, arguments, result preview, duration) when
//! `show_tools` is on and prints a JSON envelope when `json_output` is on.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Instant;

use super::console::Console;
use crate::core::{AppConfig, ToolResult};
use crate::permissions::ApprovalStore;
use crate::sandbox::resolve;
use crate::tools::ToolExecutor;

/// Longest result preview printed by the tool trace
const PREVIEW_CHARS: usize = 200;

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Blank line or `#` comment
    Empty,
    Help,
    Tools,
    Workspace,
    Approvals,
    Clear,
    Exit,
    /// `<tool> <json-args>`
    Call { tool: String, args: Value },
}

/// Parse a console or script line
pub fn parse_line(line: &str) -> Result<ReplCommand> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(ReplCommand::Empty);
    }

    if let Some(command) = line.strip_prefix('!') {
        return match command.trim() {
            "help" => Ok(ReplCommand::Help),
            "tools" => Ok(ReplCommand::Tools),
            "workspace" => Ok(ReplCommand::Workspace),
            "approvals" => Ok(ReplCommand::Approvals),
            other => bail!("unknown command: !{} (try !help)", other),
        };
    }

    match line {
        "exit" | "quit" => return Ok(ReplCommand::Exit),
        "clear" => return Ok(ReplCommand::Clear),
        _ => {}
    }

    let (tool, rest) = match line.split_once(char::is_whitespace) {
        Some((tool, rest)) => (tool, rest.trim()),
        None => (line, ""),
    };
    Ok(ReplCommand::Call {
        tool: tool.to_string(),
        args: parse_args(rest)?,
    })
}

/// Parse a JSON argument object; empty input means no arguments
pub fn parse_args(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    let args: Value =
        serde_json::from_str(raw).with_context(|| format!("arguments are not valid JSON: {}", raw))?;
    if !args.is_object() {
        bail!("arguments must be a JSON object");
    }
    Ok(args)
}

/// Compact JSON of `value`, cut to [`PREVIEW_CHARS`] characters
pub fn preview(value: &Value) -> String {
    let text = value.to_string();
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

/// JSON record of one call: `{tool, args, result | error, timestamp}`
pub fn envelope(tool: &str, args: &Value, result: &ToolResult<Value>) -> Value {
    let timestamp = chrono::Utc::now().to_rfc3339();
    match result {
        Ok(value) => json!({
            "tool": tool,
            "args": args,
            "result": value,
            "timestamp": timestamp,
        }),
        Err(e) => json!({
            "tool": tool,
            "args": args,
            "error": e.to_string(),
            "timestamp": timestamp,
        }),
    }
}

/// Console front end over a [`ToolExecutor`]
pub struct ToolSession {
    executor: ToolExecutor,
    approvals: ApprovalStore,
    console: Console,
    show_tools: bool,
    json_output: bool,
}

impl ToolSession {
    /// Create a session printing according to `config`
    pub fn new(executor: ToolExecutor, config: &AppConfig) -> Self {
        let approvals_file = match std::env::current_dir() {
            Ok(cwd) => resolve(&cwd, &config.approvals_file),
            Err(_) => config.approvals_file.clone(),
        };
        let approvals = ApprovalStore::new(approvals_file);
        Self {
            executor,
            approvals,
            console: Console::new(),
            show_tools: config.show_tools,
            json_output: config.json_output,
        }
    }

    /// The executor behind this session
    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Call a tool, tracing it and printing its outcome
    pub async fn invoke(&self, tool: &str, args: &Value) -> ToolResult<Value> {
        // the trace would corrupt a stream of JSON envelopes
        let trace = self.show_tools && !self.json_output;
        if trace {
            self.console.print_tool_call(tool, args);
        }

        let started = Instant::now();
        let result = self.executor.call(tool, args).await;
        let elapsed = started.elapsed();

        if self.json_output {
            println!("{}", envelope(tool, args, &result));
            return result;
        }

        match &result {
            Ok(value) => {
                if trace {
                    self.console.print_tool_success(&preview(value), elapsed);
                }
                self.console.print_result(value);
            }
            Err(e) => {
                if trace {
                    self.console.print_tool_failure(e, elapsed);
                } else {
                    self.console.print_error(&e.to_string());
                }
                if let Some((stdout, stderr)) = e.captured_output() {
                    self.console.print_captured_output(stdout, stderr);
                }
            }
        }
        result
    }

    /// Print the tool list, as function-calling JSON when `json` is set
    pub fn print_tools(&self, json: bool) -> Result<()> {
        if json {
            let tools = Value::Array(self.executor.to_api_format());
            println!("{}", serde_json::to_string_pretty(&tools)?);
        } else {
            self.console.print_tools(&self.executor.list_tools());
        }
        Ok(())
    }

    /// Handle one line; returns `false` when the session should end
    pub async fn handle_line(&self, line: &str) -> Result<bool> {
        match parse_line(line)? {
            ReplCommand::Empty => {}
            ReplCommand::Help => self.console.print_help(),
            ReplCommand::Tools => self.print_tools(false)?,
            ReplCommand::Workspace => {
                self.console.print_system(&format!(
                    "Workspace: {}",
                    self.executor.workspace_dir().display()
                ));
                for root in self.executor.sandbox().roots() {
                    self.console
                        .print_system(&format!("Allowed: {}", root.display()));
                }
            }
            ReplCommand::Approvals => {
                let approvals = self.approvals.list().await;
                self.console.print_approvals(&approvals);
            }
            ReplCommand::Clear => self.console.clear_screen(),
            ReplCommand::Exit => return Ok(false),
            ReplCommand::Call { tool, args } => {
                // failures are already printed
                let _ = self.invoke(&tool, &args).await;
            }
        }
        Ok(true)
    }

    /// Read and handle lines until `exit` or end of input
    pub async fn run_repl(&self) -> Result<()> {
        self.console.print_banner();
        tracing::info!("Interactive session started");

        while let Some(line) = self.console.read_input()? {
            match self.handle_line(&line).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => self.console.print_error(&format!("{:#}", e)),
            }
        }

        tracing::info!("Interactive session ended");
        Ok(())
    }

    /// Run one tool call per non-empty, non-comment line of `script`
    ///
    /// Returns the number of calls that failed. Console commands in a
    /// script are handled as in the REPL; `exit` stops the script.
    pub async fn run_file(&self, script: &Path) -> Result<usize> {
        let contents = tokio::fs::read_to_string(script)
            .await
            .with_context(|| format!("failed to read script {}", script.display()))?;

        tracing::info!("Running script {}", script.display());
        let mut failures = 0;
        for (number, line) in contents.lines().enumerate() {
            match parse_line(line) {
                Ok(ReplCommand::Empty) => {}
                Ok(ReplCommand::Exit) => break,
                Ok(ReplCommand::Call { tool, args }) => {
                    if self.invoke(&tool, &args).await.is_err() {
                        failures += 1;
                    }
                }
                Ok(_) => {
                    self.handle_line(line).await?;
                }
                Err(e) => {
                    failures += 1;
                    self.console
                        .print_error(&format!("line {}: {:#}", number + 1, e));
                }
            }
        }

        tracing::info!("Script finished with {} failure(s)", failures);
        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolError;
    use tempfile::TempDir;

    #[test]
    fn test_parse_console_commands() {
        assert_eq!(parse_line("").unwrap(), ReplCommand::Empty);
        assert_eq!(parse_line("  # note").unwrap(), ReplCommand::Empty);
        assert_eq!(parse_line("!help").unwrap(), ReplCommand::Help);
        assert_eq!(parse_line("!tools").unwrap(), ReplCommand::Tools);
        assert_eq!(parse_line("!workspace").unwrap(), ReplCommand::Workspace);
        assert_eq!(parse_line("!approvals").unwrap(), ReplCommand::Approvals);
        assert_eq!(parse_line("quit").unwrap(), ReplCommand::Exit);
        assert_eq!(parse_line("clear").unwrap(), ReplCommand::Clear);
        assert!(parse_line("!session").is_err());
    }

    #[test]
    fn test_parse_tool_calls() {
        assert_eq!(
            parse_line("list_directory").unwrap(),
            ReplCommand::Call {
                tool: "list_directory".into(),
                args: json!({})
            }
        );
        assert_eq!(
            parse_line(r#"read_file {"path": "a b.txt"}"#).unwrap(),
            ReplCommand::Call {
                tool: "read_file".into(),
                args: json!({"path": "a b.txt"})
            }
        );
        assert!(parse_line("read_file {path}").is_err());
        assert!(parse_line("read_file [1, 2]").is_err());
    }

    #[test]
    fn test_preview_is_cut() {
        let short = json!({"a": 1});
        assert_eq!(preview(&short), r#"{"a":1}"#);

        let long = json!("x".repeat(500));
        let cut = preview(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_envelope() {
        let args = json!({"path": "a"});
        let ok = envelope("read_file", &args, &Ok(json!("hi")));
        assert_eq!(ok["tool"], "read_file");
        assert_eq!(ok["result"], "hi");
        assert!(ok.get("error").is_none());

        let err = envelope(
            "read_file",
            &args,
            &Err(ToolError::AccessDenied("/etc".into())),
        );
        assert_eq!(err["error"], "path access denied: /etc");
        assert!(err.get("result").is_none());
        assert!(err["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_run_file_counts_failures() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        let config = AppConfig::new()
            .with_workspace_dir(&workspace)
            .with_allowed_paths([&workspace])
            .with_approvals_file(temp.path().join("approvals.json"))
            .with_show_tools(false);
        let executor = ToolExecutor::new(&config)
            .unwrap()
            .with_working_dir(&workspace);
        let session = ToolSession::new(executor, &config);

        let script = temp.path().join("script.txt");
        std::fs::write(
            &script,
            "# setup\nwrite_file {\"path\": \"a.txt\", \"content\": \"hi\"}\n\n\
             read_file {\"path\": \"../outside.txt\"}\nread_file not-json\n",
        )
        .unwrap();

        let failures = session.run_file(&script).await.unwrap();
        assert_eq!(failures, 2);
        assert_eq!(std::fs::read_to_string(workspace.join("a.txt")).unwrap(), "hi");
    }
}
