//! Source resolution: manifest entry to local directory

use std::path::PathBuf;

use aimgr_fs::{NormalizedPath, RepoPath};
use aimgr_git::WorkspaceCache;

use crate::manifest::ManifestSource;
use crate::{Error, Result};

/// Produces a local directory holding a source's content.
pub trait SourceResolver {
    /// Resolve `source`, failing with [`Error::SourceUnavailable`].
    fn resolve(&self, source: &ManifestSource) -> Result<PathBuf>;
}

/// Resolves URL sources through the `.workspace/` clone cache and path
/// sources to their absolute location.
#[derive(Debug, Clone)]
pub struct CacheResolver {
    cache: WorkspaceCache,
}

impl CacheResolver {
    pub fn new(repo_root: &NormalizedPath) -> Self {
        Self {
            cache: WorkspaceCache::new(repo_root.join(RepoPath::WorkspaceDir.as_str())),
        }
    }
}

impl SourceResolver for CacheResolver {
    fn resolve(&self, source: &ManifestSource) -> Result<PathBuf> {
        let base = if let Some(url) = &source.url {
            self.cache
                .get_or_clone(url, source.reference.as_deref())
                .map_err(|e| Error::unavailable(&source.name, e))?
        } else if let Some(path) = &source.path {
            let absolute = NormalizedPath::absolute(path)?;
            if !absolute.is_dir() {
                return Err(Error::unavailable(
                    &source.name,
                    format!("path does not exist or is not a directory: {absolute}"),
                ));
            }
            absolute
        } else {
            return Err(Error::unavailable(&source.name, "no path or url configured"));
        };

        let resolved = match source.subpath.as_deref() {
            Some(subpath) => base.join(subpath.trim_matches('/')),
            None => base,
        };
        if !resolved.is_dir() {
            return Err(Error::unavailable(
                &source.name,
                format!("subpath not found: {resolved}"),
            ));
        }

        tracing::debug!(source = %source.name, path = %resolved, "resolved source");
        Ok(resolved.to_native())
    }
}
