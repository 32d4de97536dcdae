//! Change recording
//!
//! Decides whether an observed change goes into the trace log.
//!
//! | old | new | action |
//! |---|---|---|
//! | `x` | `x` | nothing |
//! | empty | `y` | accepted silently (first observation) |
//! | `x` | `y` | ask the operator; append a trace line if they agree |
//!
//! The in-memory value is updated by the engine regardless of what happens
//! here: the log is an audit trail, not a gate.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::traits::{Confirmer, Notifier, TraceEntry, TraceLog};

/// What the recorder did with one observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Old and new value are equal
    Unchanged,
    /// First value ever seen for the source
    FirstObservation,
    /// Operator said no
    Declined,
    /// The prompt could not be shown or answered
    Unconfirmed,
    /// No trace log is open for this run
    Unavailable,
    /// A line was appended
    Recorded,
    /// The operator agreed but the append failed
    Failed(String),
}

impl RecordOutcome {
    /// Whether a trace line was written
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded)
    }
}

/// Asks about changes and writes the trace log
#[derive(Clone)]
pub struct ChangeRecorder {
    confirmer: Arc<dyn Confirmer>,
    notifier: Arc<dyn Notifier>,
    trace: Option<Arc<dyn TraceLog>>,
}

impl ChangeRecorder {
    /// Create a recorder
    ///
    /// `trace` is `None` when the trace log could not be opened; changes
    /// are then accepted without prompting.
    pub fn new(
        confirmer: Arc<dyn Confirmer>,
        notifier: Arc<dyn Notifier>,
        trace: Option<Arc<dyn TraceLog>>,
    ) -> Self {
        Self {
            confirmer,
            notifier,
            trace,
        }
    }

    /// Whether change recording is possible at all this run
    pub fn is_available(&self) -> bool {
        self.trace.is_some()
    }

    /// Decide whether to record `old_value` → `new_value` for `name`
    ///
    /// Suspends until the operator answers when a prompt is needed.
    pub async fn maybe_record(&self, name: &str, old_value: &str, new_value: &str) -> RecordOutcome {
        if old_value == new_value {
            return RecordOutcome::Unchanged;
        }
        if old_value.is_empty() {
            debug!(source = %name, "First observation, not recorded");
            return RecordOutcome::FirstObservation;
        }

        let Some(trace) = &self.trace else {
            warn!(source = %name, "Trace log unavailable; change from {} to {} not recorded", old_value, new_value);
            return RecordOutcome::Unavailable;
        };

        let question = format!("Do you want to record the changes of {}'s data?", name);
        match self.confirmer.confirm(&question).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(source = %name, "Operator declined to record change");
                return RecordOutcome::Declined;
            }
            Err(e) => {
                warn!(source = %name, "Confirmation unavailable: {}", e);
                return RecordOutcome::Unconfirmed;
            }
        }

        let entry = TraceEntry::new(name, old_value, new_value);
        match trace.append(&entry).await {
            Ok(()) => {
                info!(source = %name, "Recorded change from {} to {}", old_value, new_value);
                self.notifier
                    .notify("Success", "The change has been recorded in the trace log");
                RecordOutcome::Recorded
            }
            Err(e) => {
                warn!(source = %name, "Failed to record change: {}", e);
                self.notifier.alert("Failure", &e.to_string());
                RecordOutcome::Failed(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for ChangeRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeRecorder")
            .field("available", &self.is_available())
            .finish()
    }
}
