// # HTTP Document Loader
//
// This crate provides the HTTP-backed DocumentLoader for the seismometer
// monitor.
//
// ## Behavior
//
// - One GET per load, no caching and no retry
// - Connection failures and non-2xx statuses are network errors
// - A body that is not JSON is a malformed-document error
//
// ## Timeouts
//
// No timeout is applied unless one is configured. A hung server then holds
// the refresh of that one source until it gives up.

use async_trait::async_trait;
use seismo_core::error::FetchError;
use seismo_core::traits::DocumentLoader;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`HttpDocumentLoader`]
#[derive(Debug, Clone, Default)]
pub struct HttpLoaderSettings {
    /// Whole-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

/// Loads JSON documents over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpDocumentLoader {
    /// HTTP client
    client: reqwest::Client,
}

impl HttpDocumentLoader {
    /// Create a loader with the given settings
    pub fn new(settings: HttpLoaderSettings) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            client: builder.build().unwrap_or_default(),
        }
    }
}

impl Default for HttpDocumentLoader {
    fn default() -> Self {
        Self::new(HttpLoaderSettings::default())
    }
}

#[async_trait]
impl DocumentLoader for HttpDocumentLoader {
    async fn load(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(format!("Please check your internet: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::network(format!("HTTP error: {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(format!("Failed to read response: {}", e)))?;

        debug!("Loaded {} bytes from {}", body.len(), url);

        serde_json::from_slice(&body).map_err(|e| FetchError::malformed(e.to_string()))
    }

    fn loader_name(&self) -> &'static str {
        "http"
    }
}
