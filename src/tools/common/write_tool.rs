//! Write tool for creating/writing files
//!
//! Writes content to a file inside the sandbox, creating parent directories
//! as needed.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use super::FileEncoding;
use crate::core::{ToolError, ToolResult};
use crate::tools::schema::{ParameterSchema, ParameterSpec, ParameterType};
use crate::tools::tool::{optional_str, required_str, Tool, ToolContext, ToolKind};

/// Write tool for creating files
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in the workspace, creating it if it does not exist"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required(
                "path",
                ParameterSpec::new(ParameterType::String, "File path, relative to the workspace"),
            )
            .required(
                "content",
                ParameterSpec::new(ParameterType::String, "File content"),
            )
            .optional(
                "encoding",
                ParameterSpec::new(
                    ParameterType::String,
                    "utf-8 (default) or base64 when content is base64-encoded bytes",
                )
                .with_default("utf-8"),
            )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Filesystem
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = ctx.target_path()?;
        let content = required_str(args, "content")?;
        let encoding = FileEncoding::parse(optional_str(args, "encoding")?)?;

        let bytes = match encoding {
            FileEncoding::Utf8 => content.as_bytes().to_vec(),
            FileEncoding::Base64 => STANDARD.decode(content.trim()).map_err(|e| {
                ToolError::InvalidArgument(format!("content is not valid base64: {}", e))
            })?,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::info!("Writing file: {}", path.display());
        tokio::fs::write(path, &bytes).await?;
        tracing::debug!("Wrote {} bytes", bytes.len());

        Ok(json!({
            "success": true,
            "path": path.display().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn ctx_for(path: std::path::PathBuf) -> ToolContext {
        let mut ctx = ToolContext::new("/", Duration::from_secs(1));
        ctx.path = Some(path);
        ctx
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a").join("b").join("note.txt");

        let result = WriteFileTool
            .execute(
                &json!({"path": "a/b/note.txt", "content": "hi"}),
                &ctx_for(file.clone()),
            )
            .await
            .unwrap();

        assert_eq!(result["success"], true);
        assert_eq!(result["path"], file.display().to_string());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("note.txt");
        std::fs::write(&file, "old content that is longer").unwrap();

        WriteFileTool
            .execute(&json!({"path": "note.txt", "content": "new"}), &ctx_for(file.clone()))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_write_base64() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("blob.bin");

        WriteFileTool
            .execute(
                &json!({"path": "blob.bin", "content": "AJ+Slg==", "encoding": "base64"}),
                &ctx_for(file.clone()),
            )
            .await
            .unwrap();
        assert_eq!(std::fs::read(&file).unwrap(), vec![0u8, 159, 146, 150]);

        let err = WriteFileTool
            .execute(
                &json!({"path": "blob.bin", "content": "***", "encoding": "base64"}),
                &ctx_for(file),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_content_must_be_string() {
        let temp = TempDir::new().unwrap();
        let err = WriteFileTool
            .execute(
                &json!({"path": "x", "content": 42}),
                &ctx_for(temp.path().join("x")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
        assert!(!temp.path().join("x").exists());
    }
}
