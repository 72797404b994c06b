//! The opaque error-sink handle steps forward captured exceptions to.
//!
//! Per spec §6: "an opaque handle (typically a filesystem path). The core
//! appends a line per captured exception including scenario name, step
//! name, user-id, and a textual representation... the handle's parent
//! directory must be created if absent." Format is implementation-defined;
//! this picks newline-delimited plain text, matching the teacher's
//! `tracing`-to-file conventions elsewhere in the stack.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::error;

/// A single captured step exception, ready to be written to the sink.
pub struct ExceptionEntry<'a> {
    pub scenario: &'a str,
    pub step: &'a str,
    pub user_id: u64,
    pub text: &'a str,
}

#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn write(&self, entry: ExceptionEntry<'_>);
}

/// Appends one line per exception to a file, creating its parent directory
/// on first use if it doesn't exist.
pub struct FileErrorSink {
    path: PathBuf,
    file: Mutex<Option<tokio::fs::File>>,
}

impl FileErrorSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(None),
        }
    }

    async fn open(&self) -> std::io::Result<()> {
        let mut guard = self.file.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        *guard = Some(file);
        Ok(())
    }
}

#[async_trait]
impl ErrorSink for FileErrorSink {
    async fn write(&self, entry: ExceptionEntry<'_>) {
        if let Err(e) = self.open().await {
            // Kind 5 (spec §7): internal failure, logged, engine continues.
            error!(path = %self.path.display(), error = %e, "failed to open error sink");
            return;
        }

        let line = format!(
            "scenario={} step={} user_id={} error={}\n",
            entry.scenario, entry.step, entry.user_id, entry.text
        );

        let mut guard = self.file.lock().await;
        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.write_all(line.as_bytes()).await {
                error!(path = %self.path.display(), error = %e, "failed to write to error sink");
            }
        }
    }
}

/// Discards every entry — the default when no `error_file` is configured.
pub struct NullErrorSink;

#[async_trait]
impl ErrorSink for NullErrorSink {
    async fn write(&self, _entry: ExceptionEntry<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_error_sink_creates_parent_dir_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("errors.log");
        let sink = FileErrorSink::new(&path);

        sink.write(ExceptionEntry {
            scenario: "checkout",
            step: "pay",
            user_id: 3,
            text: "boom",
        })
        .await;
        sink.write(ExceptionEntry {
            scenario: "checkout",
            step: "pay",
            user_id: 4,
            text: "boom again",
        })
        .await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("user_id=3"));
        assert!(contents.contains("user_id=4"));
    }

    #[tokio::test]
    async fn null_error_sink_does_nothing() {
        let sink = NullErrorSink;
        sink.write(ExceptionEntry {
            scenario: "s",
            step: "t",
            user_id: 0,
            text: "ignored",
        })
        .await;
    }
}
