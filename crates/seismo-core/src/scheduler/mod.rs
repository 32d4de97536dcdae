//! Scheduler
//!
//! Drives [`MonitorEngine`] refreshes from two kinds of events:
//!
//! - **Periodic tick**: every `interval`, each source is refreshed in its own
//!   task. A source that is still busy (typically waiting on an operator
//!   prompt) is skipped for that tick. Failures are logged and skipped.
//! - **Trigger**: an interactive request for one source. Each source has its
//!   own listener task and bounded channel. The listener reports progress
//!   and the result through the [`Operator`] collaborators.
//!
//! ## Shutdown
//!
//! [`SchedulerHandle::shutdown`] fires a oneshot that stops the periodic
//! driver only. Refreshes already started by a tick keep running to
//! completion. Trigger listeners stay available until the handle is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{IntervalStream, ReceiverStream};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::{MonitorEngine, MonitorEvent};
use crate::error::{Error, Result};
use crate::traits::{Clipboard, Notifier};

/// Operator-facing collaborators used by trigger listeners
#[derive(Clone)]
pub struct Operator {
    /// Progress and result notifications
    pub notifier: Arc<dyn Notifier>,

    /// Receives the value of a successfully triggered refresh
    pub clipboard: Arc<dyn Clipboard>,
}

impl Operator {
    pub fn new(notifier: Arc<dyn Notifier>, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            notifier,
            clipboard,
        }
    }
}

/// Scheduler timing and queueing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Time between periodic ticks; the first tick comes one interval after start
    pub interval: Duration,

    /// Pending triggers buffered per source
    pub trigger_capacity: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.refresh_interval_secs),
            trigger_capacity: config.trigger_channel_capacity,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Starts the periodic driver and the trigger listeners
pub struct Scheduler;

impl Scheduler {
    /// Spawn one periodic driver plus one trigger listener per source
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Parameters
    ///
    /// - `engine`: shared engine whose registry defines the source set
    /// - `operator`: collaborators used to report triggered refreshes
    /// - `settings`: tick interval and trigger queue size
    pub fn start(
        engine: Arc<MonitorEngine>,
        operator: Operator,
        settings: SchedulerSettings,
    ) -> SchedulerHandle {
        let capacity = settings.trigger_capacity.max(1);
        let mut triggers = HashMap::new();

        for name in engine.registry().names() {
            let (tx, rx) = mpsc::channel(capacity);
            tokio::spawn(listen(engine.clone(), operator.clone(), name.clone(), rx));
            triggers.insert(name, tx);
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let driver = tokio::spawn(run_periodic(engine, settings.interval, shutdown_rx));

        info!(
            "Scheduler started: {} sources, refresh every {:?}",
            triggers.len(),
            settings.interval
        );

        SchedulerHandle {
            triggers,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            driver: tokio::sync::Mutex::new(Some(driver)),
        }
    }
}

/// Control surface of a running scheduler
///
/// Dropping the handle closes every trigger channel, which ends the
/// listeners, and stops the periodic driver.
pub struct SchedulerHandle {
    triggers: HashMap<String, mpsc::Sender<()>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    driver: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerHandle {
    /// Request an interactive refresh of `name`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: queued, or a refresh for `name` is already pending
    /// - `Err(Error::UnknownSource)`: no such source
    /// - `Err(Error::Other)`: the listener for `name` is gone
    pub fn trigger(&self, name: &str) -> Result<()> {
        let tx = self
            .triggers
            .get(name)
            .ok_or_else(|| Error::unknown_source(name))?;

        match tx.try_send(()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!(source = %name, "Trigger queue full, refresh already pending");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(())) => Err(Error::Other(format!(
                "Trigger listener for '{}' has stopped",
                name
            ))),
        }
    }

    /// Stop the periodic driver
    ///
    /// # Returns
    ///
    /// `true` the first time, `false` on every later call.
    pub fn shutdown(&self) -> bool {
        let tx = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match tx {
            Some(tx) => {
                // The driver may already be gone if it panicked
                let _ = tx.send(());
                info!("Scheduler shutdown requested");
                true
            }
            None => false,
        }
    }

    /// Whether shutdown has not been requested yet
    pub fn is_running(&self) -> bool {
        self.shutdown_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Wait until the periodic driver has exited
    pub async fn stopped(&self) {
        let mut driver = self.driver.lock().await;
        if let Some(handle) = driver.take() {
            if let Err(e) = handle.await {
                warn!("Periodic driver ended abnormally: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("sources", &self.triggers.len())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Periodic driver: refresh every source on each tick until shutdown
async fn run_periodic(
    engine: Arc<MonitorEngine>,
    interval: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = IntervalStream::new(ticker);

    let mut in_flight = JoinSet::new();

    engine.emit_event(MonitorEvent::Started {
        sources_count: engine.registry().len(),
    });

    let reason = loop {
        tokio::select! {
            biased;

            result = &mut shutdown_rx => {
                break match result {
                    Ok(()) => "shutdown requested",
                    Err(_) => "scheduler handle dropped",
                };
            }

            Some(_) = ticks.next() => {
                debug!("Periodic tick");
                for name in engine.registry().names() {
                    let engine = engine.clone();
                    in_flight.spawn(async move {
                        match engine.try_refresh(&name).await {
                            Ok(_) => {}
                            Err(e) => debug!(source = %name, "Scheduled refresh failed: {}", e),
                        }
                    });
                }
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    warn!("Scheduled refresh task failed: {}", e);
                }
            }
        }
    };

    // Refreshes started by earlier ticks finish on their own
    in_flight.detach_all();

    info!("Periodic refresh stopped: {}", reason);
    engine.emit_event(MonitorEvent::Stopped {
        reason: reason.to_string(),
    });
}

/// Trigger listener for one source
async fn listen(
    engine: Arc<MonitorEngine>,
    operator: Operator,
    name: String,
    rx: mpsc::Receiver<()>,
) {
    let mut requests = ReceiverStream::new(rx);

    while requests.next().await.is_some() {
        operator
            .notifier
            .notify("Retrieving...", "You will be notified soon");

        let outcome = match engine.refresh(&name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(source = %name, "Triggered refresh failed: {}", e);
                operator.notifier.alert("Failure", &e.to_string());
                continue;
            }
        };

        let value = outcome.value();
        match operator.clipboard.write_text(value).await {
            Ok(()) => operator.notifier.notify(
                "Success",
                &format!("{} has been retrieved and copied to your clipboard", value),
            ),
            Err(e) => {
                warn!(source = %name, "Clipboard write failed: {}", e);
                operator
                    .notifier
                    .alert("Failure", "Cannot copy to your clipboard");
            }
        }
    }

    debug!(source = %name, "Trigger listener stopped");
}
