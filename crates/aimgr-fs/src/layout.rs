//! Well-known paths inside a resource repository.

use std::path::Path;

/// Fixed files and directories of a resource repository root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoPath {
    /// The source manifest (`ai.repo.yaml`)
    Manifest,
    /// The metadata sidecar root (`.metadata`)
    MetadataDir,
    /// Sync history, relative to the metadata root
    SourceState,
    /// Clone cache for remote sources (`.workspace`)
    WorkspaceDir,
    /// The `.gitignore` at the repository root
    GitIgnore,
    /// The `.git` directory
    GitDir,
}

impl RepoPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifest => "ai.repo.yaml",
            Self::MetadataDir => ".metadata",
            Self::SourceState => ".metadata/sources.json",
            Self::WorkspaceDir => ".workspace",
            Self::GitIgnore => ".gitignore",
            Self::GitDir => ".git",
        }
    }
}

impl AsRef<Path> for RepoPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
