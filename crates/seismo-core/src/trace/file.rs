// # File Trace Log
//
// Append-only text file implementation of TraceLog.
//
// ## Durability
//
// - The file is opened once (read/append/create) and held for the whole run
// - Each entry is one `write_all` of a complete line under an async mutex,
//   so concurrent appends never interleave
// - Every append is flushed before returning; there is no write-behind buffer

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::Error;
use crate::traits::trace_log::{TraceEntry, TraceLog};

/// File-backed trace log
///
/// # Example
///
/// ```rust,no_run
/// use seismo_core::trace::FileTraceLog;
/// use seismo_core::traits::{TraceEntry, TraceLog};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let log = FileTraceLog::open("trace.txt").await?;
///     log.append(&TraceEntry::new("rate", "1.08", "1.09")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileTraceLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileTraceLog {
    /// Open (or create) the trace file at `path` for appending
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .await
            .map_err(|e| {
                Error::trace_log(format!(
                    "Cannot open trace file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::debug!("Trace log opened: {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TraceLog for FileTraceLog {
    async fn append(&self, entry: &TraceEntry) -> Result<(), Error> {
        let line = entry.to_line();
        let mut file = self.file.lock().await;

        file.write_all(line.as_bytes()).await.map_err(|e| {
            Error::trace_log(format!(
                "Failed to append to {}: {}",
                self.path.display(),
                e
            ))
        })?;
        file.flush().await.map_err(|e| {
            Error::trace_log(format!("Failed to flush {}: {}", self.path.display(), e))
        })?;

        tracing::trace!("Trace line appended for {}", entry.name);
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        let file = self.file.lock().await;
        file.sync_data().await.map_err(|e| {
            Error::trace_log(format!("Failed to sync {}: {}", self.path.display(), e))
        })
    }
}
