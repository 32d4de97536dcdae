// # seismo-core
//
// Core library for the seismometer change monitor.
//
// ## Architecture Overview
//
// - **SourceRegistry**: fixed set of named sources and their last observed value
// - **Fetcher**: resolves a source to its current value (literal or remote JSON + accessor)
// - **ChangeRecorder**: asks the operator whether a change belongs in the trace log
// - **MonitorEngine**: the per-source fetch → compare → record → store step
// - **Scheduler**: periodic refresh of every source plus on-demand per-source triggers
//
// ## Design Principles
//
// 1. **Per-source serialization**: a source never has two refreshes interleaving
// 2. **Cross-source parallelism**: unrelated sources never wait on each other
// 3. **Collaborators behind traits**: document loading, operator prompts,
//    notifications, clipboard and trace storage are injected
// 4. **Library-First**: the daemon is a thin shell around this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod query;
pub mod recorder;
pub mod registry;
pub mod scheduler;
pub mod trace;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, MonitorConfig, SourceSpec, TraceConfig};
pub use engine::{MonitorEngine, MonitorEvent, RefreshOutcome};
pub use error::{Error, FetchError, Result};
pub use fetch::Fetcher;
pub use recorder::{ChangeRecorder, RecordOutcome};
pub use registry::{SourceRegistry, SourceRuntimeState};
pub use scheduler::{Operator, Scheduler, SchedulerHandle, SchedulerSettings};
pub use trace::{FileTraceLog, MemoryTraceLog};
pub use traits::{Clipboard, Confirmer, DocumentLoader, Notifier, TraceEntry, TraceLog};
