//! Error types for aimgr-core
//!
//! The first five variants form the repository's error taxonomy; the rest wrap
//! lower-layer failures.

use crate::resource::ResourceKind;

/// Result type for aimgr-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aimgr-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Resource already exists and no overwrite policy was given
    #[error("{kind} '{name}' already exists (use force to overwrite or skip-existing to keep it)")]
    Conflict { kind: ResourceKind, name: String },

    /// Referenced resource, source, or metadata is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote clone or local path resolution failed
    #[error("Source '{source_name}' unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    /// Mismatch between the resource store and the metadata store
    #[error("Inconsistent repository state: {0}")]
    Inconsistent(String),

    /// Malformed manifest, package, pattern, or name
    #[error("Invalid {what}: {message}")]
    Invalid { what: String, message: String },

    /// Every configured source failed during sync
    #[error("All {count} source(s) failed to sync")]
    AllSourcesFailed { count: usize },

    #[error(transparent)]
    Fs(#[from] aimgr_fs::Error),

    #[error(transparent)]
    Git(#[from] aimgr_git::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn invalid(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}
