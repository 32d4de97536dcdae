// # Document Loader Trait
//
// Defines the interface for retrieving a remote JSON document.
//
// ## Implementations
//
// - HTTP(S): `seismo-source-http` crate
//
// ## Usage
//
// ```rust,ignore
// use seismo_core::DocumentLoader;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let loader = /* DocumentLoader implementation */;
//     let doc = loader.load("https://example.com/rates.json").await?;
//     println!("{}", doc);
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::error::FetchError;

/// Trait for document loader implementations
///
/// A loader turns a URL into a parsed JSON document. It does nothing else:
/// accessor evaluation, comparison and scheduling belong to the core.
///
/// # Contract
///
/// - Exactly one round trip per call: no caching, no retry
/// - `FetchError::Network` when the document cannot be retrieved
/// - `FetchError::MalformedDocument` only when a document was retrieved
///   but is not valid JSON
///
/// Retrying is the scheduler's business: the next tick or the next manual
/// trigger is the retry.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load and parse the JSON document at `url`
    async fn load(&self, url: &str) -> Result<serde_json::Value, FetchError>;

    /// Get the loader name (for logging/debugging)
    fn loader_name(&self) -> &'static str;
}
