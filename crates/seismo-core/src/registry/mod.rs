//! Source registry
//!
//! Holds one [`SourceRuntimeState`] per configured source name. The key set
//! is fixed when the registry is built; only the state inside each entry
//! changes afterwards.
//!
//! ## Locking
//!
//! Every entry sits behind its own async mutex and the outer map is never
//! mutated, so it needs no lock at all. Holding one entry's lock across a
//! whole refresh serializes that source without touching any other.
//!
//! ```rust,ignore
//! use seismo_core::{SourceRegistry, SourceSpec};
//!
//! let registry = SourceRegistry::from_specs(vec![SourceSpec::literal("A", "5")]);
//! assert_eq!(registry.names(), vec!["A".to_string()]);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::SourceSpec;

/// Mutable per-source state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRuntimeState {
    /// The source's fetch descriptor
    pub spec: SourceSpec,
    /// Last value successfully observed; empty means never observed
    pub retrieved: String,
}

impl SourceRuntimeState {
    /// Fresh state: nothing observed yet
    pub fn new(spec: SourceSpec) -> Self {
        Self {
            spec,
            retrieved: String::new(),
        }
    }
}

/// Shared handle to one source's state
pub type SourceEntry = Arc<Mutex<SourceRuntimeState>>;

/// Fixed-key registry of source states
#[derive(Debug, Default)]
pub struct SourceRegistry {
    /// Per-source state, each behind its own lock
    entries: HashMap<String, SourceEntry>,

    /// Names in configuration order (for menus)
    order: Vec<String>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from a loaded source list
    ///
    /// A repeated name keeps its last definition.
    pub fn from_specs(specs: impl IntoIterator<Item = SourceSpec>) -> Self {
        let mut registry = Self::new();

        for spec in specs {
            let name = spec.name.clone();
            let entry = Arc::new(Mutex::new(SourceRuntimeState::new(spec)));
            if registry.entries.insert(name.clone(), entry).is_some() {
                warn!("Duplicate source '{}' in configuration; last definition wins", name);
            } else {
                registry.order.push(name);
            }
        }

        registry
    }

    /// Source names in configuration order
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of sources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no sources
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is a known source
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Shared handle to a source's state
    pub fn entry(&self, name: &str) -> Option<SourceEntry> {
        self.entries.get(name).cloned()
    }

    /// Copy of a source's current state
    ///
    /// Waits if the source is mid-refresh.
    pub async fn snapshot(&self, name: &str) -> Option<SourceRuntimeState> {
        let entry = self.entries.get(name)?;
        Some(entry.lock().await.clone())
    }

    /// Last observed value of a source
    pub async fn retrieved(&self, name: &str) -> Option<String> {
        self.snapshot(name).await.map(|state| state.retrieved)
    }
}
