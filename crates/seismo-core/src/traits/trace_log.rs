// # Trace Log Trait
//
// Defines the interface for the durable, append-only change history.
//
// ## Line Format
//
// ```text
// 2025-01-09 12:00:00: [rate] changed from 1.08 to 1.09 \n
// ```
//
// ## Implementations
//
// - File-based: `trace::FileTraceLog`
// - In-memory: `trace::MemoryTraceLog` (tests, ephemeral runs)

use async_trait::async_trait;
use chrono::{DateTime, Local};

/// Timestamp layout used in trace lines
pub const TRACE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One accepted change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// When the change was recorded
    pub timestamp: DateTime<Local>,
    /// Source name
    pub name: String,
    /// Value before the change
    pub old_value: String,
    /// Value after the change
    pub new_value: String,
}

impl TraceEntry {
    /// Create an entry stamped with the current local time
    pub fn new(
        name: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            name: name.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }

    /// Render the entry as one trace line, trailing newline included
    pub fn to_line(&self) -> String {
        format!(
            "{}: [{}] changed from {} to {} \n",
            self.timestamp.format(TRACE_TIMESTAMP_FORMAT),
            self.name,
            self.old_value,
            self.new_value
        )
    }
}

/// Trait for trace log implementations
///
/// # Thread Safety
///
/// `append` may be called concurrently by refreshes of different sources.
/// Implementations must serialize writes so that each entry lands as one
/// whole line.
#[async_trait]
pub trait TraceLog: Send + Sync {
    /// Append one entry
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the line was written
    /// - `Err(Error::TraceLog)`: the write failed; nothing is rolled back
    async fn append(&self, entry: &TraceEntry) -> Result<(), crate::Error>;

    /// Push any buffered bytes to durable storage
    async fn flush(&self) -> Result<(), crate::Error>;
}
