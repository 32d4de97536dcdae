//! Error types for the seismometer monitor
//!
//! [`Error`] is the crate-wide error. [`FetchError`] classifies why a single
//! source could not produce a value; it is kept separate so callers can tell
//! an unreachable document from a query that matched nothing.

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a source could not be fetched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The remote document could not be retrieved
    #[error("Network error: {0}")]
    Network(String),

    /// The document was retrieved but is not valid JSON
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The accessor matched no node, or could not be parsed
    #[error("Query error: {0}")]
    Query(String),
}

impl FetchError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a malformed-document error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Create a query error
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Whether this failure happened before any document was obtained
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Core error type for the monitor
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing or unparsable source file, bad settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The named source is not in the registry
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Trace log open or append failures
    #[error("Trace log error: {0}")]
    TraceLog(String),

    /// An operator-facing collaborator (prompt, clipboard) is unreachable
    #[error("Operator error: {0}")]
    Operator(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unknown-source error
    pub fn unknown_source(name: impl Into<String>) -> Self {
        Self::UnknownSource(name.into())
    }

    /// Create a trace log error
    pub fn trace_log(msg: impl Into<String>) -> Self {
        Self::TraceLog(msg.into())
    }

    /// Create an operator error
    pub fn operator(msg: impl Into<String>) -> Self {
        Self::Operator(msg.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
