//! Append-only structured log for fetch failures.
//!
//! Every failed fetch appends one JSON record to a local file and the run
//! carries on. The log is write-only during a run; it exists so partial
//! failures can be audited afterwards without ever interrupting the export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::types::ExportError;

/// Which fetch operation a failure record belongs to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    Stores,
    Taxonomies { store_id: i64 },
    Products { store_id: i64, taxon_id: i64 },
}

/// One logged failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub when: DateTime<Utc>,
    pub scope: ErrorScope,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorRecord {
    pub fn new(scope: ErrorScope, error: &ExportError) -> Self {
        let cause = std::error::Error::source(error).map(|source| source.to_string());
        Self {
            when: Utc::now(),
            scope,
            message: error.to_string(),
            cause,
        }
    }
}

/// Handle to the on-disk failure log. Cheap to clone; appends are serialized.
#[derive(Clone, Debug)]
pub struct ErrorLog {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl ErrorLog {
    /// Creates a log that appends to `path`. The file and its parent
    /// directory are created lazily on first record.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path the log appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one failure record. Logging is best-effort: an I/O failure
    /// here is reported through `tracing` and otherwise swallowed, so the
    /// pipeline's never-throw fetch boundary holds even when the log itself
    /// is unwritable.
    pub async fn record(&self, scope: ErrorScope, error: &ExportError) {
        let record = ErrorRecord::new(scope, error);
        if let Err(log_err) = self.append(&record).await {
            tracing::warn!(error = %log_err, path = %self.path.display(), "failed to append error record");
        }
    }

    async fn append(&self, record: &ErrorRecord) -> Result<(), ExportError> {
        let line = serde_json::to_string(record)?;
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn shape_error(message: &str) -> ExportError {
        ExportError::Shape(message.to_string())
    }

    #[tokio::test]
    async fn appends_one_json_line_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("errors.jsonl");
        let log = ErrorLog::new(&path);

        log.record(ErrorScope::Stores, &shape_error("missing stock_locations"))
            .await;
        log.record(
            ErrorScope::Taxonomies { store_id: 12 },
            &shape_error("bad taxons"),
        )
        .await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: ErrorRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.scope, ErrorScope::Stores);
        assert!(first.message.contains("missing stock_locations"));

        let second: ErrorRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.scope, ErrorScope::Taxonomies { store_id: 12 });
    }

    #[tokio::test]
    async fn creates_parent_directory_on_first_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/logs/errors.jsonl");
        let log = ErrorLog::new(&path);

        log.record(
            ErrorScope::Products {
                store_id: 1,
                taxon_id: 2,
            },
            &shape_error("boom"),
        )
        .await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn recording_to_an_unwritable_path_does_not_panic() {
        let dir = tempdir().unwrap();
        // Use the directory itself as the "file" path; the append will fail.
        let log = ErrorLog::new(dir.path());
        log.record(ErrorScope::Stores, &shape_error("ignored")).await;
    }

    #[test]
    fn scope_serializes_with_discriminator() {
        let scope = ErrorScope::Products {
            store_id: 7,
            taxon_id: 42,
        };
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json["scope"], "products");
        assert_eq!(json["store_id"], 7);
        assert_eq!(json["taxon_id"], 42);
    }
}
