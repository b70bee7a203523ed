//! Persisted approvals for gray-tier commands
//!
//! A "remember" confirmation stores `{ expiresAt }` under a signature built
//! from the working directory and the normalized command. The whole file is
//! re-read on every lookup so separate processes see each other's grants.
//!
//! There is no locking: two processes granting different commands at the
//! same moment can overwrite each other and one grant is lost (last write
//! wins). The cost is one extra confirmation. Each save writes a uniquely
//! named temp file beside the target and renames it into place, so the file
//! on disk is always one complete save.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{ToolError, ToolResult};

/// How long a remembered approval stays valid
pub const APPROVAL_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Signature -> record, ordered so the file diffs cleanly
pub type ApprovalMap = BTreeMap<String, ApprovalRecord>;

/// A cached approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    /// Epoch milliseconds after which the record is void
    pub expires_at: i64,
}

impl ApprovalRecord {
    /// Create a record that expires `window` after `now_ms`
    pub fn expiring_after(now_ms: i64, window: Duration) -> Self {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        Self {
            expires_at: now_ms.saturating_add(window_ms),
        }
    }

    /// A record is valid iff it expires strictly after `now_ms`
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }

    /// Expiry as a UTC timestamp
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }
}

/// Confirmation flag passed with a gray-tier shell call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalMode {
    /// Run this one call, persist nothing
    Once,
    /// Run and remember for [`APPROVAL_WINDOW`]
    Remember,
}

impl ApprovalMode {
    /// Parse the `approval` argument; unknown values count as no flag
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "once" => Some(ApprovalMode::Once),
            "remember_7d" | "remember-7d" => Some(ApprovalMode::Remember),
            _ => None,
        }
    }
}

/// Key for a command approved from a given directory
///
/// The same command from another directory gets another signature, so a
/// path-dependent grant never leaks across projects.
pub fn approval_signature(working_dir: &Path, normalized_command: &str) -> String {
    format!("{}::{}", working_dir.display(), normalized_command)
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Storage seam for approvals, so the file store can be swapped for a
/// locked or database-backed one without touching the executor
#[async_trait]
pub trait ApprovalCache: Send + Sync {
    /// Return the record for `signature` if it is still valid
    async fn lookup(&self, signature: &str) -> Option<ApprovalRecord>;

    /// Store a fresh record for `signature`
    async fn grant(&self, signature: &str) -> ToolResult<ApprovalRecord>;
}

/// JSON-file approval store
#[derive(Debug, Clone)]
pub struct ApprovalStore {
    path: PathBuf,
    window: Duration,
}

impl ApprovalStore {
    /// Create a store backed by `path`; nothing is read until first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            window: APPROVAL_WINDOW,
        }
    }

    /// Override the validity window of new grants
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all valid records, pruning expired ones from disk
    pub async fn load(&self) -> ApprovalMap {
        self.load_at(now_millis()).await
    }

    /// Load as of `now_ms`
    ///
    /// A missing or corrupt file reads as empty. When any entry was dropped
    /// the pruned map is written back straight away.
    pub async fn load_at(&self, now_ms: i64) -> ApprovalMap {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ApprovalMap::new(),
            Err(e) => {
                tracing::warn!(
                    "Could not read approval store {}: {}",
                    self.path.display(),
                    e
                );
                return ApprovalMap::new();
            }
        };

        let entries: serde_json::Map<String, Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Discarding unreadable approval store {}: {}",
                    self.path.display(),
                    e
                );
                return ApprovalMap::new();
            }
        };

        let total = entries.len();
        let valid: ApprovalMap = entries
            .into_iter()
            .filter_map(|(signature, value)| {
                let record = parse_record(&value)?;
                record.is_valid_at(now_ms).then_some((signature, record))
            })
            .collect();

        if valid.len() != total {
            tracing::info!(
                "Pruning {} expired approval(s) from {}",
                total - valid.len(),
                self.path.display()
            );
            if let Err(e) = self.save(&valid).await {
                tracing::warn!("{}", e);
            }
        }

        valid
    }

    /// Overwrite the file with `approvals`
    ///
    /// Writes a sibling temp file and renames it into place, creating the
    /// parent directory first if needed.
    pub async fn save(&self, approvals: &ApprovalMap) -> ToolResult<()> {
        let persistence = |action: &str, e: &dyn std::fmt::Display| {
            ToolError::Persistence(format!("{} {}: {}", action, self.path.display(), e))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| persistence("create directory for", &e))?;
        }

        let body = serde_json::to_string_pretty(approvals)
            .map_err(|e| persistence("serialize", &e))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, body.as_bytes()))
            .await
            .map_err(|e| persistence("write", &e))?
            .map_err(|e| persistence("write", &e))?;

        tracing::debug!(
            "Saved {} approval(s) to {}",
            approvals.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Currently valid records, soonest expiry first
    pub async fn list(&self) -> Vec<(String, ApprovalRecord)> {
        let mut records: Vec<_> = self.load().await.into_iter().collect();
        records.sort_by_key(|(_, record)| record.expires_at);
        records
    }

    async fn grant_at(&self, signature: &str, now_ms: i64) -> ToolResult<ApprovalRecord> {
        let mut approvals = self.load_at(now_ms).await;
        let record = ApprovalRecord::expiring_after(now_ms, self.window);
        approvals.insert(signature.to_string(), record);
        self.save(&approvals).await?;
        tracing::info!("Remembered approval for `{}`", signature);
        Ok(record)
    }
}

/// Write `contents` to a fresh temp file next to `path`, then rename it over `path`
fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ApprovalCache for ApprovalStore {
    async fn lookup(&self, signature: &str) -> Option<ApprovalRecord> {
        let now = now_millis();
        self.load_at(now)
            .await
            .get(signature)
            .copied()
            .filter(|record| record.is_valid_at(now))
    }

    async fn grant(&self, signature: &str) -> ToolResult<ApprovalRecord> {
        self.grant_at(signature, now_millis()).await
    }
}

/// Accept `{"expiresAt": <number>}`; anything else is dropped on load
fn parse_record(value: &Value) -> Option<ApprovalRecord> {
    let expires = value.get("expiresAt")?;
    let expires_at = expires
        .as_i64()
        .or_else(|| expires.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
    Some(ApprovalRecord { expires_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> ApprovalStore {
        ApprovalStore::new(temp.path().join("sessions").join("command-approvals.json"))
    }

    #[test]
    fn test_signature_depends_on_directory() {
        let a = approval_signature(Path::new("/proj/a"), "npm install");
        let b = approval_signature(Path::new("/proj/b"), "npm install");
        assert_eq!(a, "/proj/a::npm install");
        assert_ne!(a, b);
    }

    #[test]
    fn test_approval_mode_parse() {
        assert_eq!(ApprovalMode::parse("once"), Some(ApprovalMode::Once));
        assert_eq!(ApprovalMode::parse("ONCE"), Some(ApprovalMode::Once));
        assert_eq!(ApprovalMode::parse("remember_7d"), Some(ApprovalMode::Remember));
        assert_eq!(ApprovalMode::parse("remember-7d"), Some(ApprovalMode::Remember));
        assert_eq!(ApprovalMode::parse("always"), None);
        assert_eq!(ApprovalMode::parse(""), None);
    }

    #[test]
    fn test_record_validity_is_strict() {
        let record = ApprovalRecord { expires_at: 1_000 };
        assert!(record.is_valid_at(999));
        assert!(!record.is_valid_at(1_000));
        assert!(!record.is_valid_at(1_001));
    }

    #[test]
    fn test_record_expiry_window() {
        let record = ApprovalRecord::expiring_after(0, APPROVAL_WINDOW);
        assert_eq!(record.expires_at, 604_800_000);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert!(store.load().await.is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_grant_then_lookup() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let record = store.grant("/w::npm install").await.unwrap();
        assert!(record.is_valid_at(now_millis()));

        assert_eq!(store.lookup("/w::npm install").await, Some(record));
        assert_eq!(store.lookup("/w::npm publish").await, None);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["/w::npm install"]["expiresAt"], record.expires_at);
    }

    #[tokio::test]
    async fn test_expired_records_are_pruned_from_disk() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let now = now_millis();
        let mut approvals = ApprovalMap::new();
        approvals.insert("old".into(), ApprovalRecord { expires_at: now - 1 });
        approvals.insert("fresh".into(), ApprovalRecord { expires_at: now + 60_000 });
        store.save(&approvals).await.unwrap();

        let loaded = store.load_at(now).await;
        assert!(loaded.contains_key("fresh"));
        assert!(!loaded.contains_key("old"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("\"old\""));
        assert!(raw.contains("\"fresh\""));
    }

    #[tokio::test]
    async fn test_grant_expires_after_window() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let granted_at = 1_000_000;
        let record = store.grant_at("sig", granted_at).await.unwrap();
        assert!(store.load_at(record.expires_at - 1).await.contains_key("sig"));

        assert!(store.load_at(record.expires_at).await.is_empty());
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("sig"));
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(store.load().await.is_empty());

        // a later grant replaces the corrupt file
        store.grant("sig").await.unwrap();
        assert!(store.lookup("sig").await.is_some());
    }

    #[tokio::test]
    async fn test_malformed_entries_are_dropped() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        let far = now_millis() + 60_000;
        std::fs::write(
            store.path(),
            format!(
                r#"{{"good": {{"expiresAt": {}}}, "bad": {{"expiresAt": "soon"}}, "worse": 3}}"#,
                far
            ),
        )
        .unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("good"));
    }

    #[tokio::test]
    async fn test_concurrent_grants_leave_valid_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.grant(&format!("/w::npm run task{}", i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert!(json.as_object().is_some_and(|map| !map.is_empty()));
        assert!(!store.load().await.is_empty());

        let names: Vec<_> = std::fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("command-approvals.json")]);
    }

    #[tokio::test]
    async fn test_list_sorted_by_expiry() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let now = now_millis();
        let mut approvals = ApprovalMap::new();
        approvals.insert("late".into(), ApprovalRecord { expires_at: now + 20_000 });
        approvals.insert("early".into(), ApprovalRecord { expires_at: now + 10_000 });
        store.save(&approvals).await.unwrap();

        let listed: Vec<_> = store.list().await.into_iter().map(|(s, _)| s).collect();
        assert_eq!(listed, vec!["early".to_string(), "late".to_string()]);
    }
}
