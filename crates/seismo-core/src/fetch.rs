//! Source fetching
//!
//! Resolves a [`SourceSpec`] to its current value:
//!
//! - empty accessor: the `source` string itself, no I/O
//! - otherwise: one document load from `source`, then the accessor's first
//!   match rendered as text
//!
//! No caching and no retry happen here.

use std::sync::Arc;
use tracing::debug;

use crate::config::SourceSpec;
use crate::error::FetchError;
use crate::query::{Query, inner_text};
use crate::traits::DocumentLoader;

/// Resolves sources to values
#[derive(Clone)]
pub struct Fetcher {
    loader: Arc<dyn DocumentLoader>,
}

impl Fetcher {
    /// Create a fetcher that loads remote documents through `loader`
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }

    /// Fetch the current value of `spec`
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: the literal, or the text of the first accessor match
    /// - `Err(FetchError::Network)`: the document could not be retrieved
    /// - `Err(FetchError::MalformedDocument)`: the document is not JSON
    /// - `Err(FetchError::Query)`: bad accessor, or nothing matched
    pub async fn fetch(&self, spec: &SourceSpec) -> Result<String, FetchError> {
        if spec.is_literal() {
            return Ok(spec.source.clone());
        }

        // Parse first so a broken accessor costs no round trip
        let query = Query::parse(&spec.accessor)?;

        debug!(
            source = %spec.name,
            loader = self.loader.loader_name(),
            "Loading {}",
            spec.source
        );
        let doc = self.loader.load(&spec.source).await?;

        query.find_one(&doc).map(inner_text).ok_or_else(|| {
            FetchError::query(format!(
                "Cannot parse remote source using rules provided: '{}' matched nothing",
                spec.accessor
            ))
        })
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("loader", &self.loader.loader_name())
            .finish()
    }
}
