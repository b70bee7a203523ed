//! Command risk classification
//!
//! Every shell command is sorted into one of four tiers from its first
//! three whitespace-separated tokens. The tables below are fixed at compile
//! time and the decision is a pure function of the normalized command.
//!
//! Evaluation order:
//! 1. empty command -> gray
//! 2. black list -> black (arguments are never consulted)
//! 3. green list -> green
//! 4. structural rules for `git`, JS package managers and pip
//! 5. gray list -> gray
//! 6. anything else -> white

use serde::{Deserialize, Serialize};

/// Read-only inspection commands, always allowed
pub const GREEN_COMMANDS: &[&str] = &[
    "ls", "pwd", "echo", "cat", "head", "tail", "grep", "wc", "rg", "which", "whoami", "uname",
    "date", "uptime", "df", "du",
];

/// Destructive or process/system-control commands, always refused
pub const BLACK_COMMANDS: &[&str] = &[
    "rm", "mv", "dd", "truncate", "mkfs", "shutdown", "reboot", "kill", "pkill", "killall",
    "chmod", "chown",
];

/// Toolchains, runtimes, build systems and orchestration CLIs
pub const GRAY_COMMANDS: &[&str] = &[
    "npm",
    "pnpm",
    "yarn",
    "bun",
    "npx",
    "node",
    "python",
    "python3",
    "pip",
    "pip3",
    "go",
    "cargo",
    "rustc",
    "javac",
    "mvn",
    "gradle",
    "make",
    "cmake",
    "docker",
    "docker-compose",
    "kubectl",
    "git",
    "deno",
];

const GIT_READ_ONLY: &[&str] = &["status", "diff", "log", "show"];

const GIT_MUTATING: &[&str] = &[
    "checkout",
    "switch",
    "pull",
    "fetch",
    "merge",
    "rebase",
    "reset",
    "push",
    "commit",
    "tag",
    "branch",
    "stash",
    "cherry-pick",
    "revert",
    "clean",
    "init",
    "clone",
];

const JS_PACKAGE_MANAGERS: &[&str] = &["npm", "pnpm", "yarn", "bun"];

/// Scripts that only check or format code
const JS_SAFE_SCRIPTS: &[&str] = &["lint", "test", "typecheck", "format", "fmt", "check"];

const JS_SAFE_SUBCOMMANDS: &[&str] = &["test", "lint"];

const PYTHON_INSTALLERS: &[&str] = &["pip", "pip3"];

/// Risk tier of a shell command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Read-only, always allowed
    Green,
    /// Allowed by a structural rule or by the permissive default
    White,
    /// Needs confirmation or a cached approval
    Gray,
    /// Never executed
    Black,
}

impl RiskTier {
    /// Whether a command of this tier runs without any confirmation
    pub fn runs_unattended(&self) -> bool {
        matches!(self, RiskTier::Green | RiskTier::White)
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Green => write!(f, "green"),
            RiskTier::White => write!(f, "white"),
            RiskTier::Gray => write!(f, "gray"),
            RiskTier::Black => write!(f, "black"),
        }
    }
}

/// The first three tokens of a normalized command; absent tokens are empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParts<'a> {
    pub command_name: &'a str,
    pub sub_command: &'a str,
    pub sub_sub_command: &'a str,
}

impl<'a> CommandParts<'a> {
    /// Split a command on whitespace
    pub fn parse(command: &'a str) -> Self {
        let mut tokens = command.split_whitespace();
        Self {
            command_name: tokens.next().unwrap_or(""),
            sub_command: tokens.next().unwrap_or(""),
            sub_sub_command: tokens.next().unwrap_or(""),
        }
    }
}

/// Trim and collapse every whitespace run to a single space
pub fn normalize_command(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify a raw command string
pub fn classify(command: &str) -> RiskTier {
    let normalized = normalize_command(command);
    let parts = CommandParts::parse(&normalized);
    let tier = classify_parts(&parts);
    tracing::debug!("Classified `{}` as {}", normalized, tier);
    tier
}

fn classify_parts(parts: &CommandParts<'_>) -> RiskTier {
    let name = parts.command_name;

    if name.is_empty() {
        return RiskTier::Gray;
    }
    if BLACK_COMMANDS.contains(&name) {
        return RiskTier::Black;
    }
    if GREEN_COMMANDS.contains(&name) {
        return RiskTier::Green;
    }

    if name == "git" {
        if GIT_READ_ONLY.contains(&parts.sub_command) {
            return RiskTier::White;
        }
        if GIT_MUTATING.contains(&parts.sub_command) {
            return RiskTier::Gray;
        }
    }

    if JS_PACKAGE_MANAGERS.contains(&name) {
        if parts.sub_command == "run" && JS_SAFE_SCRIPTS.contains(&parts.sub_sub_command) {
            return RiskTier::White;
        }
        if JS_SAFE_SUBCOMMANDS.contains(&parts.sub_command) {
            return RiskTier::White;
        }
        // install/update/publish/run/exec and everything unmatched
        return RiskTier::Gray;
    }

    if PYTHON_INSTALLERS.contains(&name) {
        return RiskTier::Gray;
    }

    if GRAY_COMMANDS.contains(&name) {
        return RiskTier::Gray;
    }

    tracing::warn!(
        "Command `{}` matched no policy rule; allowing by default",
        name
    );
    RiskTier::White
}
