// # Tray Menu
//
// Offers each source as a tray menu entry. Activating an entry triggers an
// interactive refresh; the result reaches the operator through the usual
// notifier and clipboard. `Stop refreshing` ends the periodic timer.
//
// The tray runs its own D-Bus thread. Menu callbacks only enqueue triggers,
// so they never block on a refresh.

use seismo_core::SchedulerHandle;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Tray icon name from the freedesktop icon theme
const TRAY_ICON_NAME: &str = "utilities-system-monitor";

/// Tray state shared with the D-Bus thread
pub struct SourceTray {
    names: Vec<String>,
    scheduler: Arc<SchedulerHandle>,
}

impl SourceTray {
    pub fn new(names: Vec<String>, scheduler: Arc<SchedulerHandle>) -> Self {
        Self { names, scheduler }
    }

    fn trigger(&self, name: &str) {
        if let Err(e) = self.scheduler.trigger(name) {
            warn!("Cannot trigger {} from tray: {}", name, e);
        }
    }
}

impl ksni::Tray for SourceTray {
    fn id(&self) -> String {
        "seismod".into()
    }

    fn title(&self) -> String {
        "Seismometer".into()
    }

    fn icon_name(&self) -> String {
        TRAY_ICON_NAME.into()
    }

    fn menu(&self) -> Vec<ksni::MenuItem<Self>> {
        use ksni::menu::{MenuItem, StandardItem};

        let mut items: Vec<MenuItem<Self>> = self
            .names
            .iter()
            .map(|name| {
                let name = name.clone();
                StandardItem {
                    label: name.clone(),
                    activate: Box::new(move |tray: &mut Self| tray.trigger(&name)),
                    ..Default::default()
                }
                .into()
            })
            .collect();

        if items.is_empty() {
            items.push(
                StandardItem {
                    label: "No sources configured".into(),
                    enabled: false,
                    ..Default::default()
                }
                .into(),
            );
        }

        items.push(MenuItem::Separator);
        items.push(
            StandardItem {
                label: "Stop refreshing".into(),
                enabled: self.scheduler.is_running(),
                activate: Box::new(|tray: &mut Self| {
                    if tray.scheduler.shutdown() {
                        info!("Periodic refresh stopped from tray");
                    }
                }),
                ..Default::default()
            }
            .into(),
        );
        items
    }
}

/// Run the tray service on its own thread
///
/// A missing session bus only disables the tray; the console keeps working.
pub fn spawn(names: Vec<String>, scheduler: Arc<SchedulerHandle>) {
    let service = ksni::TrayService::new(SourceTray::new(names, scheduler));
    let spawned = thread::Builder::new()
        .name("seismod-tray".into())
        .spawn(move || {
            let _ = service.run();
            debug!("Tray service stopped");
        });

    if let Err(e) = spawned {
        warn!("Cannot start tray thread: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::CommandClipboard;
    use crate::console::{ConsoleConfirmer, ConsoleNotifier};
    use ksni::Tray;
    use ksni::menu::MenuItem;
    use seismo_core::{
        ChangeRecorder, EngineConfig, Fetcher, MonitorEngine, Operator, Scheduler,
        SchedulerSettings, SourceRegistry, SourceSpec,
    };
    use seismo_source_http::HttpDocumentLoader;
    use std::time::Duration;

    fn scheduler(specs: Vec<SourceSpec>) -> (Arc<MonitorEngine>, Arc<SchedulerHandle>) {
        let recorder = ChangeRecorder::new(
            Arc::new(ConsoleConfirmer::channel().0),
            Arc::new(ConsoleNotifier),
            None,
        );
        let (engine, _events) = MonitorEngine::new(
            SourceRegistry::from_specs(specs),
            Fetcher::new(Arc::new(HttpDocumentLoader::default())),
            recorder,
            &EngineConfig::default(),
        )
        .unwrap();
        let engine = Arc::new(engine);
        let operator = Operator::new(
            Arc::new(ConsoleNotifier),
            Arc::new(CommandClipboard::with_commands(Vec::new())),
        );
        let handle = Scheduler::start(engine.clone(), operator, SchedulerSettings::default());
        (engine, Arc::new(handle))
    }

    fn activate(tray: &mut SourceTray, label: &str) {
        let menu = tray.menu();
        let item = menu
            .iter()
            .find_map(|item| match item {
                MenuItem::Standard(item) if item.label == label => Some(item),
                _ => None,
            })
            .expect("menu entry");
        (item.activate)(tray);
    }

    #[tokio::test]
    async fn menu_lists_sources_then_stop() {
        let (_engine, handle) = scheduler(vec![
            SourceSpec::literal("rate", "1"),
            SourceSpec::literal("pin", "2"),
        ]);
        let tray = SourceTray::new(vec!["rate".into(), "pin".into()], handle);

        let labels: Vec<String> = tray
            .menu()
            .iter()
            .filter_map(|item| match item {
                MenuItem::Standard(item) => Some(item.label.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["rate", "pin", "Stop refreshing"]);
    }

    #[tokio::test]
    async fn entry_triggers_refresh() {
        let (engine, handle) = scheduler(vec![SourceSpec::literal("rate", "1")]);
        let mut tray = SourceTray::new(vec!["rate".into()], handle);

        activate(&mut tray, "rate");

        tokio::time::timeout(Duration::from_secs(5), async {
            while engine.registry().retrieved("rate").await.as_deref() != Some("1") {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("triggered refresh completes");
    }

    #[tokio::test]
    async fn stop_entry_ends_periodic_refresh() {
        let (_engine, handle) = scheduler(Vec::new());
        let mut tray = SourceTray::new(Vec::new(), handle.clone());

        assert!(matches!(tray.menu()[0], MenuItem::Standard(ref item) if !item.enabled));
        activate(&mut tray, "Stop refreshing");

        assert!(!handle.is_running());
    }
}
