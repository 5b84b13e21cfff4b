//! Error types for registry operations

use thiserror::Error;

/// Registry operation errors
#[derive(Debug, Error)]
pub enum RegistryError {
    // ============ Configuration Errors ============
    #[error("Invalid registry URL: '{url}' - {reason}")]
    InvalidRegistryUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },

    // ============ Response Errors ============
    #[error("Registry rejected upload: {status} - {message}")]
    Rejected { status: u16, message: String },

    // ============ Transport Errors ============
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RegistryError {
    /// Whether the request never produced an HTTP response
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RegistryError::Network { .. } | RegistryError::Timeout { .. } | RegistryError::Io(_)
        )
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(e: url::ParseError) -> Self {
        RegistryError::InvalidRegistryUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
