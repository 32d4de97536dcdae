//! Configuration types for the seismometer monitor
//!
//! The source list lives in a JSON array on disk. Two entry shapes are
//! accepted and normalized into one [`SourceSpec`]:
//!
//! ```json
//! [
//!   { "name": "rate", "source": "https://example.com/fx.json", "accessor": "//usd" },
//!   { "name": "pin",  "source": "1234", "accessor": "" },
//!   { "name": "old",  "value": "https://example.com/fx.json->//eur" },
//!   { "name": "lit",  "value": "hello" }
//! ]
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

/// Delimiter used by the legacy `value` form between URL and accessor
pub const LEGACY_ACCESSOR_DELIMITER: &str = "->";

/// Default config file read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "cathay.json";

/// Default trace log path
pub const DEFAULT_TRACE_PATH: &str = "trace.txt";

/// Main monitor configuration
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Sources to watch
    pub sources: Vec<SourceSpec>,

    /// Where change records go
    pub trace: TraceConfig,

    /// Engine and scheduler settings
    pub engine: EngineConfig,
}

impl MonitorConfig {
    /// Create a configuration for the given sources with default settings
    pub fn new(sources: Vec<SourceSpec>) -> Self {
        Self {
            sources,
            trace: TraceConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// An empty source list is valid: the monitor still runs with nothing to watch.
    pub fn validate(&self) -> Result<()> {
        for spec in &self.sources {
            spec.validate()?;
        }
        self.trace.validate()?;
        self.engine.validate()
    }
}

/// Immutable description of one watched source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Unique source name
    pub name: String,

    /// Literal value, or the URL of a JSON document when `accessor` is set
    pub source: String,

    /// Path query into the fetched document; empty means `source` is literal
    pub accessor: String,
}

impl SourceSpec {
    /// A source whose value is `value` itself
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: value.into(),
            accessor: String::new(),
        }
    }

    /// A source read from the JSON document at `url` through `accessor`
    pub fn remote(
        name: impl Into<String>,
        url: impl Into<String>,
        accessor: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: url.into(),
            accessor: accessor.into(),
        }
    }

    /// Whether fetching this source touches the network
    pub fn is_literal(&self) -> bool {
        self.accessor.is_empty()
    }

    /// Validate the source specification
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Source name cannot be empty"));
        }
        if !self.is_literal() && self.source.trim().is_empty() {
            return Err(Error::config(format!(
                "Source '{}' has an accessor but no URL",
                self.name
            )));
        }
        Ok(())
    }
}

/// On-disk entry, in either the structured or the legacy shape
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceEntry {
    Structured {
        name: String,
        source: String,
        #[serde(default)]
        accessor: Option<String>,
    },
    Legacy {
        name: String,
        value: String,
    },
}

impl TryFrom<SourceEntry> for SourceSpec {
    type Error = Error;

    fn try_from(entry: SourceEntry) -> Result<Self> {
        match entry {
            SourceEntry::Structured {
                name,
                source,
                accessor,
            } => Ok(SourceSpec {
                name,
                source,
                accessor: accessor.unwrap_or_default(),
            }),
            SourceEntry::Legacy { name, value } => {
                if !value.contains(LEGACY_ACCESSOR_DELIMITER) {
                    return Ok(SourceSpec::literal(name, value));
                }

                // Text after a second delimiter is ignored
                let mut tokens = value.split(LEGACY_ACCESSOR_DELIMITER);
                let url = tokens.next().unwrap_or_default();
                let accessor = tokens.next().unwrap_or_default();
                if accessor.is_empty() {
                    return Err(Error::config(format!(
                        "Source '{}' has no accessor after '{}'",
                        name, LEGACY_ACCESSOR_DELIMITER
                    )));
                }
                Ok(SourceSpec::remote(name, url, accessor))
            }
        }
    }
}

/// Parse a JSON source list in either supported shape
pub fn parse_sources(json: &str) -> Result<Vec<SourceSpec>> {
    let entries: Vec<SourceEntry> = serde_json::from_str(json)
        .map_err(|e| Error::config(format!("Cannot parse source list: {}", e)))?;

    let specs = entries
        .into_iter()
        .map(SourceSpec::try_from)
        .collect::<Result<Vec<_>>>()?;
    for spec in &specs {
        spec.validate()?;
    }
    Ok(specs)
}

/// Read and parse the source list at `path`
pub async fn load_sources<P: AsRef<Path>>(path: P) -> Result<Vec<SourceSpec>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::config(format!(
            "Config file {} not found or unreadable: {}",
            path.display(),
            e
        ))
    })?;
    parse_sources(&content)
}

/// Trace log configuration
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Path to the append-only trace file
    pub path: String,
}

impl TraceConfig {
    /// Validate the trace configuration
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(Error::config("Trace path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_TRACE_PATH.to_string(),
        }
    }
}

/// Engine and scheduler configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval between periodic refreshes of every source (in seconds)
    pub refresh_interval_secs: u64,

    /// Capacity of the monitor event channel
    ///
    /// When full, new events are dropped (with a warning log).
    pub event_channel_capacity: usize,

    /// Pending interactive triggers kept per source
    pub trigger_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(Error::config("Refresh interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }
        if self.trigger_channel_capacity == 0 {
            return Err(Error::config("Trigger channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            trigger_channel_capacity: default_trigger_channel_capacity(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_trigger_channel_capacity() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_entries() {
        let specs = parse_sources(
            r#"[
                {"name":"A","source":"5","accessor":""},
                {"name":"B","source":"https://example.com/x.json","accessor":"//price"},
                {"name":"C","source":"plain"}
            ]"#,
        )
        .unwrap();

        assert_eq!(specs[0], SourceSpec::literal("A", "5"));
        assert_eq!(
            specs[1],
            SourceSpec::remote("B", "https://example.com/x.json", "//price")
        );
        assert!(specs[2].is_literal());
    }

    #[test]
    fn parses_legacy_entries() {
        let specs = parse_sources(
            r#"[
                {"name":"old","value":"https://example.com/fx.json->//eur"},
                {"name":"lit","value":"hello"}
            ]"#,
        )
        .unwrap();

        assert_eq!(specs[0].source, "https://example.com/fx.json");
        assert_eq!(specs[0].accessor, "//eur");
        assert_eq!(specs[1], SourceSpec::literal("lit", "hello"));
    }

    #[test]
    fn legacy_split_takes_second_token_as_accessor() {
        let specs = parse_sources(r#"[{"name":"x","value":"u->a->b"}]"#).unwrap();
        assert_eq!(specs[0].source, "u");
        assert_eq!(specs[0].accessor, "a");
    }

    #[test]
    fn legacy_trailing_delimiter_is_rejected() {
        let err = parse_sources(r#"[{"name":"x","value":"https://h/doc.json->"}]"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("no accessor")));

        let err = parse_sources(r#"[{"name":"y","value":"u->->a"}]"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let err = parse_sources("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = parse_sources(r#"[{"name":"x"}]"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = parse_sources(r#"[{"name":" ","source":"1"}]"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.refresh_interval_secs, 30);
        assert!(engine.validate().is_ok());

        let zero = EngineConfig {
            refresh_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn monitor_config_defaults_and_validation() {
        let config = MonitorConfig::new(vec![SourceSpec::literal("A", "5")]);
        assert_eq!(config.engine.trigger_channel_capacity, 4);
        assert!(config.validate().is_ok());

        let defaults = MonitorConfig::new(Vec::new());
        assert_eq!(defaults.trace.path, DEFAULT_TRACE_PATH);
        assert!(defaults.validate().is_ok(), "no sources is still a valid run");

        let blank_trace = MonitorConfig {
            trace: TraceConfig {
                path: " ".to_string(),
            },
            ..MonitorConfig::default()
        };
        assert!(matches!(blank_trace.validate(), Err(Error::Config(_))));

        let bad = MonitorConfig::new(vec![SourceSpec::remote("R", "", "//v")]);
        assert!(matches!(bad.validate(), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sources(dir.path().join("absent.json")).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cathay.json");
        tokio::fs::write(&path, r#"[{"name":"A","value":"5"}]"#)
            .await
            .unwrap();

        let specs = load_sources(&path).await.unwrap();
        assert_eq!(specs, vec![SourceSpec::literal("A", "5")]);
    }
}
