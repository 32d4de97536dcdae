// # Memory Trace Log
//
// In-memory implementation of TraceLog.
//
// Nothing survives a restart. Useful for tests and for runs where the
// change history is not worth keeping.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::trace_log::{TraceEntry, TraceLog};

/// In-memory trace log
///
/// Clones share the same underlying buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryTraceLog {
    inner: Arc<RwLock<Vec<TraceEntry>>>,
}

impl MemoryTraceLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded entries
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether nothing has been recorded
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Copy of all recorded entries, oldest first
    pub async fn entries(&self) -> Vec<TraceEntry> {
        self.inner.read().await.clone()
    }

    /// All entries rendered as trace lines
    pub async fn lines(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .iter()
            .map(TraceEntry::to_line)
            .collect()
    }
}

#[async_trait]
impl TraceLog for MemoryTraceLog {
    async fn append(&self, entry: &TraceEntry) -> Result<(), Error> {
        self.inner.write().await.push(entry.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_trace_basic() {
        let log = MemoryTraceLog::new();
        assert!(log.is_empty().await);

        log.append(&TraceEntry::new("A", "1", "2")).await.unwrap();
        let shared = log.clone();
        shared.append(&TraceEntry::new("A", "2", "3")).await.unwrap();

        assert_eq!(log.len().await, 2);
        let entries = log.entries().await;
        assert_eq!(entries[1].old_value, "2");
        assert!(log.lines().await[0].contains("[A] changed from 1 to 2"));
    }
}
