//! CLI error types with exit code handling
//!
//! Only errors that end the run live here. Per-chart packaging and upload
//! failures are reported in the run summary instead, unless
//! `--fail-on-error` turns them into [`CliError::Batch`].

use chartpush_core::CoreError;
use chartpush_registry::RegistryError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chartpush::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Candidates could not be resolved
    #[error("Selection failed: {message}")]
    #[diagnostic(code(chartpush::cli::selection))]
    Selection {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (chart root unreadable, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartpush::cli::io))]
    Io { message: String },

    /// Some charts failed to package or upload
    #[error("{packaging} chart(s) failed to package and {uploading} failed to upload")]
    #[diagnostic(code(chartpush::cli::batch))]
    Batch { packaging: usize, uploading: usize },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartpush::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::USAGE_ERROR,
            CliError::Selection { .. } => exit_codes::SELECTION_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Batch { packaging, .. } if *packaging > 0 => exit_codes::PACKAGE_ERROR,
            CliError::Batch { .. } => exit_codes::UPLOAD_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::ChartRootUnreadable { .. } => CliError::Io {
                message: err.to_string(),
            },
            CoreError::NotARepository { .. } => CliError::Selection {
                message: err.to_string(),
                help: Some("Run inside a git checkout or set --workspace".to_string()),
            },
            CoreError::UnknownRevision { .. } => CliError::Selection {
                message: err.to_string(),
                help: Some(
                    "Make sure both commits are fetched (shallow clones may miss the previous one)"
                        .to_string(),
                ),
            },
            CoreError::ChartRootOutsideWorkspace { .. } => CliError::Selection {
                message: err.to_string(),
                help: Some("Point --chart-dir at a directory inside --workspace".to_string()),
            },
            e if e.is_selection_error() => CliError::Selection {
                message: err.to_string(),
                help: None,
            },
            CoreError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
            _ => CliError::internal(err.to_string()),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidRegistryUrl { .. } => CliError::config_with_help(
                err.to_string(),
                "Set --repo-url (or PLUGIN_REPO_URL) to the ChartMuseum base URL",
            ),
            RegistryError::ClientBuild { .. } => CliError::config(err.to_string()),
            other => CliError::internal(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
