//! Completion providers
//!
//! The server asks a [`CompletionProvider`] for the text that belongs
//! between a prefix and a suffix. [`HttpCompletionProvider`] posts the
//! context to an HTTP endpoint and returns the response body verbatim.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Completion provider errors
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Request never produced a response
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Completion endpoint returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Repository file forwarded as extra context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    pub path: String,
    pub content: String,
}

/// Body of a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prefix: String,
    pub suffix: String,
    /// Repository name, once a project file was shared
    pub repo: Option<String>,
    pub files: Vec<ContextFile>,
}

/// Source of completion text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Text to insert between `request.prefix` and `request.suffix`
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Provider backed by an HTTP endpoint
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCompletionProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        debug!(
            endpoint = %self.endpoint,
            prefix_len = request.prefix.len(),
            suffix_len = request.suffix.len(),
            files = request.files.len(),
            "POST completion request"
        );

        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), "Completion endpoint error: {}", message);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}
