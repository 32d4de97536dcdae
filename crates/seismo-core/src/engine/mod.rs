//! Monitor engine
//!
//! The MonitorEngine owns the per-source state machine:
//!
//! ```text
//!   Idle ──► Fetching ──► Comparing ──► (RecordingChange) ──► Idle
//!               │              │
//!               │ error        │ unchanged
//!               ▼              ▼
//!              Idle           Idle
//! ```
//!
//! ## Event Flow
//!
//! 1. Lock the source's registry entry
//! 2. Fetch the current value
//! 3. Compare with the last observed value
//! 4. If different, let the ChangeRecorder decide about the trace log
//! 5. Store the new value, whatever the recorder decided
//! 6. Emit an event for monitoring/logging
//!
//! The entry lock is held from step 1 to step 5, so two refreshes of one
//! source never interleave. Different sources never share a lock.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::recorder::{ChangeRecorder, RecordOutcome};
use crate::registry::{SourceRegistry, SourceRuntimeState};

/// Events emitted by the MonitorEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Scheduler started
    Started {
        sources_count: usize,
    },

    /// A periodic refresh was skipped because the source was busy
    RefreshSkipped {
        name: String,
    },

    /// Fetch failed; state untouched
    FetchFailed {
        name: String,
        error: String,
    },

    /// Fetched value equals the stored one
    Unchanged {
        name: String,
    },

    /// First value ever stored for the source
    FirstObservation {
        name: String,
        value: String,
    },

    /// Stored value replaced
    Changed {
        name: String,
        previous: String,
        value: String,
        recorded: bool,
    },

    /// Periodic driver stopped
    Stopped {
        reason: String,
    },
}

/// Result of one completed refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fetched value equals the stored one
    Unchanged {
        value: String,
    },

    /// Stored value replaced
    Updated {
        previous: String,
        value: String,
        record: RecordOutcome,
    },
}

impl RefreshOutcome {
    /// The value now stored for the source
    pub fn value(&self) -> &str {
        match self {
            RefreshOutcome::Unchanged { value } | RefreshOutcome::Updated { value, .. } => value,
        }
    }

    /// Whether the stored value changed
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { .. })
    }
}

/// Core monitor engine
///
/// Owns the registry, the fetcher and the recorder. Shared between the
/// scheduler's tasks behind an `Arc`.
pub struct MonitorEngine {
    /// Fixed set of sources and their state
    registry: SourceRegistry,

    /// Resolves sources to values
    fetcher: Fetcher,

    /// Decides about trace log entries
    recorder: ChangeRecorder,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl MonitorEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields monitor events
    pub fn new(
        registry: SourceRegistry,
        fetcher: Fetcher,
        recorder: ChangeRecorder,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            registry,
            fetcher,
            recorder,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The source registry
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Refresh one source, waiting for any refresh already running on it
    pub async fn refresh(&self, name: &str) -> Result<RefreshOutcome> {
        let entry = self
            .registry
            .entry(name)
            .ok_or_else(|| Error::unknown_source(name))?;

        let mut state = entry.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Refresh one source unless a refresh is already running on it
    ///
    /// # Returns
    ///
    /// - `Ok(Some(outcome))`: the refresh ran
    /// - `Ok(None)`: the source was busy and nothing was done
    /// - `Err(Error)`: unknown source or fetch failure
    pub async fn try_refresh(&self, name: &str) -> Result<Option<RefreshOutcome>> {
        let entry = self
            .registry
            .entry(name)
            .ok_or_else(|| Error::unknown_source(name))?;

        let Ok(mut state) = entry.try_lock() else {
            debug!(source = %name, "Refresh already in progress, skipping");
            self.emit_event(MonitorEvent::RefreshSkipped {
                name: name.to_string(),
            });
            return Ok(None);
        };

        self.refresh_locked(&mut state).await.map(Some)
    }

    /// Fetch → compare → record → store, with the entry lock held
    async fn refresh_locked(&self, state: &mut SourceRuntimeState) -> Result<RefreshOutcome> {
        let name = state.spec.name.clone();

        let new_value = match self.fetcher.fetch(&state.spec).await {
            Ok(value) => value,
            Err(e) => {
                debug!(source = %name, "Fetch failed: {}", e);
                self.emit_event(MonitorEvent::FetchFailed {
                    name,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        if new_value == state.retrieved {
            debug!(source = %name, "Value unchanged");
            self.emit_event(MonitorEvent::Unchanged { name });
            return Ok(RefreshOutcome::Unchanged { value: new_value });
        }

        let record = self
            .recorder
            .maybe_record(&name, &state.retrieved, &new_value)
            .await;

        let previous = std::mem::replace(&mut state.retrieved, new_value.clone());

        if previous.is_empty() {
            info!(source = %name, "Observed {}", new_value);
            self.emit_event(MonitorEvent::FirstObservation {
                name,
                value: new_value.clone(),
            });
        } else {
            info!(source = %name, "Changed from {} to {}", previous, new_value);
            self.emit_event(MonitorEvent::Changed {
                name,
                previous: previous.clone(),
                value: new_value.clone(),
                recorded: record.is_recorded(),
            });
        }

        Ok(RefreshOutcome::Updated {
            previous,
            value: new_value,
            record,
        })
    }

    /// Emit a monitor event
    pub(crate) fn emit_event(&self, event: MonitorEvent) {
        match self.event_tx.try_send(event) {
            // Nobody listening is fine
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
        }
    }
}

impl std::fmt::Debug for MonitorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorEngine")
            .field("registry", &self.registry)
            .field("fetcher", &self.fetcher)
            .field("recorder", &self.recorder)
            .finish()
    }
}
