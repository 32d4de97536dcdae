// # seismod - Seismometer Daemon
//
// Thin integration layer around seismo-core. All monitoring logic lives in
// the core crate; this binary only:
// 1. Reads the command line and environment variables
// 2. Initializes tracing and the runtime
// 3. Wires the HTTP loader, trace log and console front end into the engine
// 4. Runs the scheduler until `quit` or a shutdown signal
//
// ## Usage
//
// ```bash
// seismod [sources.json]
// ```
//
// Built with `--features tray`, the same source list is also offered as a
// desktop tray menu.
//
// Without an argument the source list is read from `cathay.json` in the
// working directory. A missing or unparsable file is logged and the daemon
// runs with no sources.
//
// ## Configuration
//
// - `SEISMO_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `SEISMO_TRACE_PATH`: trace log file (default: trace.txt)
// - `SEISMO_REFRESH_INTERVAL_SECS`: periodic refresh interval, 1-86400 (default: 30)
// - `SEISMO_FETCH_TIMEOUT_SECS`: HTTP timeout, 1-600 (default: none)

mod clipboard;
mod console;
#[cfg(feature = "tray")]
mod tray;

use anyhow::Result;
use seismo_core::config::{DEFAULT_CONFIG_PATH, DEFAULT_TRACE_PATH, load_sources};
use seismo_core::{
    ChangeRecorder, EngineConfig, Fetcher, MonitorConfig, MonitorEngine, Operator, Scheduler,
    SchedulerSettings, SourceRegistry, TraceConfig, trace,
};
use seismo_source_http::{HttpDocumentLoader, HttpLoaderSettings};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::clipboard::CommandClipboard;
use crate::console::{Console, ConsoleConfirmer, ConsoleNotifier};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SeismoExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SeismoExitCode> for ExitCode {
    fn from(code: SeismoExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// How long blocked stdin reads may delay exit
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

const USAGE: &str = "Usage: seismod [sources.json]";

/// Application configuration
#[derive(Debug)]
struct Config {
    config_path: PathBuf,
    trace_path: String,
    refresh_interval_secs: Option<u64>,
    fetch_timeout_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from the command line and environment variables
    ///
    /// `args` excludes the program name.
    fn from_args_and_env(args: &[String]) -> Result<Self> {
        let config_path = match args {
            [] => PathBuf::from(DEFAULT_CONFIG_PATH),
            [path] => PathBuf::from(path),
            _ => anyhow::bail!("Expected at most one argument, got {}", args.len()),
        };

        Ok(Self {
            config_path,
            trace_path: env::var("SEISMO_TRACE_PATH")
                .unwrap_or_else(|_| DEFAULT_TRACE_PATH.to_string()),
            refresh_interval_secs: parse_env_u64("SEISMO_REFRESH_INTERVAL_SECS")?,
            fetch_timeout_secs: parse_env_u64("SEISMO_FETCH_TIMEOUT_SECS")?,
            log_level: env::var("SEISMO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.trace_path.trim().is_empty() {
            anyhow::bail!("SEISMO_TRACE_PATH cannot be empty");
        }

        if let Some(interval) = self.refresh_interval_secs
            && !(1..=86_400).contains(&interval)
        {
            anyhow::bail!(
                "SEISMO_REFRESH_INTERVAL_SECS must be between 1 and 86400 seconds. Got: {}",
                interval
            );
        }

        if let Some(timeout) = self.fetch_timeout_secs
            && !(1..=600).contains(&timeout)
        {
            anyhow::bail!(
                "SEISMO_FETCH_TIMEOUT_SECS must be between 1 and 600 seconds. Got: {}",
                timeout
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SEISMO_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::default();
        if let Some(interval) = self.refresh_interval_secs {
            engine.refresh_interval_secs = interval;
        }
        engine
    }
}

/// Read an optional numeric environment variable
fn parse_env_u64(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} must be a whole number. Got: '{}'", name, value)),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let config = match Config::from_args_and_env(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("{}", USAGE);
            return SeismoExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SeismoExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout belongs to the console menu
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SeismoExitCode::ConfigError.into();
    }

    info!("Starting seismod daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SeismoExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            SeismoExitCode::RuntimeError
        } else {
            SeismoExitCode::CleanShutdown
        }
    });

    // The console's stdin read cannot be cancelled
    rt.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let sources = match load_sources(&config.config_path).await {
        Ok(sources) => sources,
        Err(e) => {
            error!("{}; running with no sources", e);
            Vec::new()
        }
    };
    info!(
        "Loaded {} source(s) from {}",
        sources.len(),
        config.config_path.display()
    );
    let monitor = MonitorConfig {
        sources,
        trace: TraceConfig {
            path: config.trace_path.clone(),
        },
        engine: config.engine_config(),
    };
    monitor.validate()?;

    let trace_log = match trace::open(&monitor.trace).await {
        Ok(log) => Some(log),
        Err(e) => {
            warn!("{}; changes will not be recorded", e);
            None
        }
    };

    let loader = HttpDocumentLoader::new(HttpLoaderSettings {
        request_timeout: config.fetch_timeout_secs.map(Duration::from_secs),
    });

    let (confirmer, confirm_rx) = ConsoleConfirmer::channel();
    let notifier = Arc::new(ConsoleNotifier);
    let recorder = ChangeRecorder::new(Arc::new(confirmer), notifier.clone(), trace_log.clone());

    let (engine, mut events) = MonitorEngine::new(
        SourceRegistry::from_specs(monitor.sources),
        Fetcher::new(Arc::new(loader)),
        recorder,
        &monitor.engine,
    )?;
    let engine = Arc::new(engine);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Monitor event");
        }
    });

    let operator = Operator::new(notifier, Arc::new(CommandClipboard::new()));
    let scheduler = Arc::new(Scheduler::start(
        engine.clone(),
        operator,
        SchedulerSettings::from_config(&monitor.engine),
    ));

    #[cfg(feature = "tray")]
    tray::spawn(engine.registry().names(), scheduler.clone());

    let console = Console::new(engine.registry().names(), scheduler.clone(), confirm_rx);
    tokio::spawn(console.run());

    info!("Daemon initialized successfully");

    tokio::select! {
        signal = wait_for_shutdown_signal() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
            scheduler.shutdown();
        }
        _ = scheduler.stopped() => {}
    }
    scheduler.stopped().await;

    if let Some(log) = &trace_log
        && let Err(e) = log.flush().await
    {
        warn!("Failed to flush trace log: {}", e);
    }

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
///
/// # Returns
///
/// The name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Result<Config> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        Config::from_args_and_env(&args)
    }

    #[test]
    fn test_config_path_argument() {
        assert_eq!(
            config(&[]).unwrap().config_path,
            PathBuf::from(DEFAULT_CONFIG_PATH)
        );
        assert_eq!(
            config(&["sources.json"]).unwrap().config_path,
            PathBuf::from("sources.json")
        );
        assert!(config(&["a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let mut cfg = Config {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            trace_path: DEFAULT_TRACE_PATH.to_string(),
            refresh_interval_secs: Some(30),
            fetch_timeout_secs: None,
            log_level: "info".to_string(),
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.engine_config().refresh_interval_secs, 30);

        cfg.refresh_interval_secs = Some(0);
        assert!(cfg.validate().is_err());

        cfg.refresh_interval_secs = None;
        cfg.fetch_timeout_secs = Some(601);
        assert!(cfg.validate().is_err());

        cfg.fetch_timeout_secs = Some(10);
        cfg.log_level = "loud".to_string();
        assert!(cfg.validate().is_err());

        cfg.log_level = "DEBUG".to_string();
        cfg.trace_path = " ".to_string();
        assert!(cfg.validate().is_err());
    }
}
