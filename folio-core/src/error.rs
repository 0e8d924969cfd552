//! Error types shared across the portfolio crates

use thiserror::Error;

/// Folio-wide error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FolioError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FolioError {
    pub fn api(msg: impl Into<String>) -> Self {
        FolioError::Api(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        FolioError::Network(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        FolioError::Timeout(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        FolioError::Parse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        FolioError::NotFound(msg.into())
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        FolioError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        FolioError::Config(msg.into())
    }

    /// Whether the failure means the remote side could not be reached at all.
    ///
    /// Used by the holdings loader to flip the offline indicator.
    pub fn is_network(&self) -> bool {
        matches!(self, FolioError::Network(_) | FolioError::Timeout(_))
    }
}

/// Result type alias for portfolio operations
pub type FolioResult<T> = Result<T, FolioError>;
