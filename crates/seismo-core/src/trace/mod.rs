// # Trace Log Implementations
//
// This module provides implementations of the TraceLog trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileTraceLog;
pub use memory::MemoryTraceLog;

use std::sync::Arc;

use crate::config::TraceConfig;
use crate::traits::TraceLog;

/// Open the trace log described by `config`
pub async fn open(config: &TraceConfig) -> crate::Result<Arc<dyn TraceLog>> {
    Ok(Arc::new(FileTraceLog::open(&config.path).await?))
}
