//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("Invalid Chart.yaml: {message}")]
    InvalidChart { message: String },

    #[error("Failed to parse Chart.yaml: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Invalid .helmignore pattern '{pattern}': {message}")]
    IgnorePattern { pattern: String, message: String },

    // ============ Selection Errors ============
    #[error("Not a git repository: {path}")]
    NotARepository { path: String },

    #[error("Unknown revision: {revision}")]
    UnknownRevision { revision: String },

    #[error("Failed to diff {previous}..{current}: {message}")]
    Diff {
        previous: String,
        current: String,
        message: String,
    },

    #[error("Cannot read chart root {path}: {message}")]
    ChartRootUnreadable { path: String, message: String },

    #[error("Chart root {chart_root} is outside the workspace {workspace}")]
    ChartRootOutsideWorkspace {
        chart_root: String,
        workspace: String,
    },
}

impl CoreError {
    /// Whether this error ends the run before any chart is packaged
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            CoreError::NotARepository { .. }
                | CoreError::UnknownRevision { .. }
                | CoreError::Diff { .. }
                | CoreError::ChartRootUnreadable { .. }
                | CoreError::ChartRootOutsideWorkspace { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
