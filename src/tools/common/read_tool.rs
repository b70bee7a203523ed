//! Read tool for reading files
//!
//! Reads a file from inside the sandbox as UTF-8 text (invalid sequences
//! replaced) or as base64.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use super::FileEncoding;
use crate::core::{ToolError, ToolResult};
use crate::tools::schema::{ParameterSchema, ParameterSpec, ParameterType};
use crate::tools::tool::{optional_str, Tool, ToolContext, ToolKind};

/// Read tool for reading files
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file in the workspace"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required(
                "path",
                ParameterSpec::new(ParameterType::String, "File path, relative to the workspace"),
            )
            .optional(
                "encoding",
                ParameterSpec::new(ParameterType::String, "utf-8 (default) or base64")
                    .with_default("utf-8"),
            )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Filesystem
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = ctx.target_path()?;
        let encoding = FileEncoding::parse(optional_str(args, "encoding")?)?;

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound(format!("file {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.is_dir() {
            return Err(ToolError::InvalidArgument(format!(
                "{} is a directory",
                path.display()
            )));
        }

        tracing::info!("Reading file: {}", path.display());
        let bytes = tokio::fs::read(path).await?;

        let content = match encoding {
            FileEncoding::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
            FileEncoding::Base64 => STANDARD.encode(&bytes),
        };

        tracing::debug!("Read {} bytes", bytes.len());
        Ok(Value::String(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn ctx_for(path: std::path::PathBuf) -> ToolContext {
        let mut ctx = ToolContext::new("/", Duration::from_secs(1));
        ctx.path = Some(path);
        ctx
    }

    #[tokio::test]
    async fn test_read_utf8() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("hello.txt");
        std::fs::write(&file, "hello\nworld").unwrap();

        let result = ReadFileTool
            .execute(&json!({"path": "hello.txt"}), &ctx_for(file))
            .await
            .unwrap();
        assert_eq!(result, json!("hello\nworld"));
    }

    #[tokio::test]
    async fn test_read_base64() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("blob.bin");
        std::fs::write(&file, [0u8, 159, 146, 150]).unwrap();

        let result = ReadFileTool
            .execute(&json!({"path": "blob.bin", "encoding": "base64"}), &ctx_for(file))
            .await
            .unwrap();
        assert_eq!(result, json!("AJ+Slg=="));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ReadFileTool
            .execute(&json!({"path": "nope"}), &ctx_for(temp.path().join("nope")))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = ReadFileTool
            .execute(&json!({"path": "."}), &ctx_for(temp.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }
}
