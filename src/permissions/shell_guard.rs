//! Shell-safety filter
//!
//! Commands are never handed to a shell, and anything that would need one
//! is refused outright: no metacharacters anywhere, and every token must
//! come from a small safe character set.

use regex::Regex;
use std::sync::LazyLock;

use super::classifier::normalize_command;
use crate::core::{ToolError, ToolResult};

/// Characters that chain, redirect, substitute or expand in a POSIX shell
pub const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '<', '>', '`', '$'];

// ASCII only: letters, digits, dot, underscore, slash, hyphen
static SAFE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._/-]+$").expect("safe token pattern compiles"));

/// Validate a raw command and return its normalized form
///
/// Checks run in order: empty, metacharacters on the raw string, then
/// per-token character set on the normalized string.
pub fn check_command(raw: &str) -> ToolResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArgument(
            "command must not be empty".to_string(),
        ));
    }

    if let Some(c) = trimmed.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
        return Err(ToolError::InvalidArgument(format!(
            "command contains illegal character '{}'",
            c
        )));
    }

    let normalized = normalize_command(trimmed);
    if let Some(token) = normalized.split(' ').find(|t| !is_safe_token(t)) {
        return Err(ToolError::InvalidArgument(format!(
            "command contains illegal argument '{}'",
            token
        )));
    }

    Ok(normalized)
}

/// Whether a single token is made only of safe characters
pub fn is_safe_token(token: &str) -> bool {
    SAFE_TOKEN.is_match(token)
}
