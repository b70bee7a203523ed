use colored::*;
use serde_json::Value;
use std::io::{self, Write};
use std::time::Duration;

use crate::core::ToolError;
use crate::permissions::ApprovalRecord;
use crate::tools::ToolDescriptor;

/// Console handles all terminal I/O with colored formatting
pub struct Console {
    prompt_color: Color,
    tool_color: Color,
    result_color: Color,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            prompt_color: Color::Cyan,
            tool_color: Color::Magenta,
            result_color: Color::Green,
        }
    }

    /// Print a system message (errors, info, etc.)
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Read a line of input; `None` at end of input
    pub fn read_input(&self) -> io::Result<Option<String>> {
        print!("{} ", "loongclaw>".color(self.prompt_color).bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Print a welcome banner
    pub fn print_banner(&self) {
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", "  LoongClaw - tool console".bright_blue().bold());
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!("Type `<tool> <json-args>` to call a tool, !help for commands, exit to quit.");
        println!();
    }

    /// Print the interactive command reference
    pub fn print_help(&self) {
        println!("{}", "Commands:".yellow().bold());
        println!("  <tool> <json-args>  Call a tool, e.g. read_file {{\"path\": \"a.txt\"}}");
        println!("  !help               Show this help");
        println!("  !tools              List available tools");
        println!("  !workspace          Show the workspace directory and sandbox roots");
        println!("  !approvals          List remembered command approvals");
        println!("  clear               Clear the screen");
        println!("  exit / quit         Leave the console");
        println!();
        println!("{}", "Environment:".yellow().bold());
        println!("  WORKSPACE_DIR   Workspace directory (default ./workspace)");
        println!("  ALLOWED_PATHS   Sandbox roots, comma separated");
        println!("  APPROVALS_FILE  Remembered approvals file");
        println!("  SHELL_TIMEOUT   Default shell timeout in milliseconds");
        println!("  LOG_LEVEL       Log level (debug|info|warn|error)");
        println!("  SHOW_TOOLS      Show tool call traces (true|false)");
        println!("  JSON_OUTPUT     Print results as JSON (true|false)");
        println!();
    }

    /// Clear the terminal
    pub fn clear_screen(&self) {
        print!("\x1B[2J\x1B[1;1H");
        let _ = io::stdout().flush();
    }

    /// Print the tool name and arguments before a call
    pub fn print_tool_call(&self, tool_name: &str, args: &Value) {
        let args = serde_json::to_string_pretty(args).unwrap_or_else(|_| args.to_string());
        println!(
            "{} {}",
            "Tool:".color(self.tool_color).bold(),
            tool_name.color(self.tool_color)
        );
        println!("{} {}", "Args:".bright_black(), args.bright_black());
    }

    /// Print a result preview and the elapsed time after a successful call
    pub fn print_tool_success(&self, preview: &str, elapsed: Duration) {
        println!("{} {}", "Result:".color(self.result_color).bold(), preview);
        println!("{}", format!("({}ms)", elapsed.as_millis()).bright_black());
    }

    /// Print the error and the elapsed time after a failed call
    pub fn print_tool_failure(&self, error: &ToolError, elapsed: Duration) {
        println!("{} {}", "Tool Error:".red().bold(), error);
        println!("{}", format!("({}ms)", elapsed.as_millis()).bright_black());
    }

    /// Print a full tool result
    pub fn print_result(&self, result: &Value) {
        match result {
            Value::String(text) => println!("{}", text),
            other => println!(
                "{}",
                serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
            ),
        }
    }

    /// Print the output a failed shell command left behind
    pub fn print_captured_output(&self, stdout: &str, stderr: &str) {
        if !stdout.trim().is_empty() {
            println!("{}", "stdout:".bright_black());
            println!("{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            println!("{}", "stderr:".bright_black());
            println!("{}", stderr.trim_end().red());
        }
    }

    /// Print one line per tool
    pub fn print_tools(&self, tools: &[ToolDescriptor]) {
        for tool in tools {
            let params: Vec<String> = tool
                .parameters
                .properties
                .keys()
                .map(|name| {
                    if tool.parameters.required.contains(name) {
                        name.clone()
                    } else {
                        format!("{}?", name)
                    }
                })
                .collect();
            println!(
                "  {} {} {}",
                tool.name.color(self.tool_color).bold(),
                format!("({})", params.join(", ")).bright_black(),
                tool.description
            );
        }
    }

    /// Print remembered approvals with their expiry
    pub fn print_approvals(&self, approvals: &[(String, ApprovalRecord)]) {
        if approvals.is_empty() {
            self.print_system("No remembered approvals");
            return;
        }
        for (signature, record) in approvals {
            let expires = record
                .expires_at_utc()
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| record.expires_at.to_string());
            println!("  {} {}", signature, format!("until {}", expires).bright_black());
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
