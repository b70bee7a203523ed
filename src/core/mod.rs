//! Core types
//!
//! This module provides the types shared by every other module:
//! - `AppConfig` - Runtime configuration loaded from the environment
//! - `ToolError` / `ToolResult` - Error types
//! - `ErrorKind` - Broad failure category reported to callers

pub mod config;
pub mod error;

pub use config::{AppConfig, LogFormat};
pub use error::{ErrorKind, ToolError, ToolResult};
