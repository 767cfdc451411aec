//! Error types for aimgr-git

/// Result type for aimgr-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aimgr-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] aimgr_fs::Error),

    #[error("Failed to clone {url}: {message}")]
    Clone { url: String, message: String },

    #[error("Ref '{reference}' not found in {url}")]
    RefNotFound { url: String, reference: String },
}
