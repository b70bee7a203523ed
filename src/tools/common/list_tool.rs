//! List tool for directory contents

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::{ToolError, ToolResult};
use crate::tools::schema::{ParameterSchema, ParameterSpec, ParameterType};
use crate::tools::tool::{Tool, ToolContext, ToolKind};

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

/// One directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

/// List tool for directories inside the workspace
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the entries of a directory in the workspace"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().optional(
            "path",
            ParameterSpec::new(
                ParameterType::String,
                "Directory path, relative to the workspace",
            )
            .with_default("."),
        )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Filesystem
    }

    async fn execute(&self, _args: &Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = ctx.target_path()?;

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound(format!("directory {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_dir() {
            return Err(ToolError::InvalidArgument(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        tracing::info!("Listing directory: {}", path.display());

        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(path).await?;
        while let Some(entry) = reader.next_entry().await? {
            let entry_type = if entry.file_type().await?.is_dir() {
                EntryType::Directory
            } else {
                EntryType::File
            };
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                entry_type,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!("Found {} entries", entries.len());
        Ok(serde_json::to_value(entries)?)
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
    async fn test_list_sorted_with_types() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.txt"), "").unwrap();
        std::fs::create_dir(temp.path().join("a_dir")).unwrap();

        let result = ListDirectoryTool
            .execute(&json!({}), &ctx_for(temp.path().to_path_buf()))
            .await
            .unwrap();

        assert_eq!(
            result,
            json!([
                {"name": "a_dir", "type": "directory"},
                {"name": "b.txt", "type": "file"},
            ])
        );
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let err = ListDirectoryTool
            .execute(&json!({}), &ctx_for(temp.path().join("ghost")))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_file_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f.txt");
        std::fs::write(&file, "").unwrap();
        let err = ListDirectoryTool
            .execute(&json!({}), &ctx_for(file))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }
}
