//! Clone cache for remote sources
//!
//! Each remote source is cloned once into `.workspace/<key>/`, where the key
//! is derived from the normalized URL and the requested ref. Later syncs fetch
//! into the existing clone instead of cloning again.

use std::fs;

use aimgr_fs::{NormalizedPath, digest, io};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Repository, ResetType};

use crate::{Error, Result, normalize_url};

const KEY_LEN: usize = 16;

/// A clone present in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedClone {
    pub key: String,
    pub path: NormalizedPath,
    /// `origin` URL, when the directory is a readable repository
    pub url: Option<String>,
}

/// Cache of Git clones rooted at a repository's `.workspace/` directory.
#[derive(Debug, Clone)]
pub struct WorkspaceCache {
    root: NormalizedPath,
}

impl WorkspaceCache {
    pub fn new(root: NormalizedPath) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// Cache directory name for a URL and optional ref.
    pub fn cache_key(url: &str, reference: Option<&str>) -> String {
        let canonical = format!("{}@{}", normalize_url(url), reference.unwrap_or(""));
        digest::short_digest(&canonical, KEY_LEN)
    }

    pub fn cache_path(&self, url: &str, reference: Option<&str>) -> NormalizedPath {
        self.root.join(&Self::cache_key(url, reference))
    }

    /// Return a local checkout of `url` at `reference`, cloning on first use.
    ///
    /// An existing clone is fetched and checked out again; if the fetch fails
    /// the cached content is used as-is. A clone that cannot be opened or
    /// checked out is deleted and cloned afresh.
    pub fn get_or_clone(&self, url: &str, reference: Option<&str>) -> Result<NormalizedPath> {
        let path = self.cache_path(url, reference);

        if path.is_present() {
            match Repository::open(path.to_native()) {
                Ok(repo) => {
                    if let Err(e) = fetch_origin(&repo) {
                        tracing::warn!(url, error = %e, "fetch failed, using cached clone");
                    }
                    match checkout(&repo, url, reference) {
                        Ok(()) => {
                            tracing::debug!(url, path = %path, "reused cached clone");
                            return Ok(path);
                        }
                        Err(e) => {
                            tracing::warn!(url, error = %e, "cached clone unusable, re-cloning");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(url, error = %e, "corrupted cache entry, re-cloning");
                }
            }
            io::remove_entry(&path)?;
        }

        if let Err(e) = clone_repo(url, &path, reference) {
            // Never leave a half-written clone behind
            let _ = io::remove_entry(&path);
            return Err(e);
        }

        tracing::info!(url, path = %path, "cloned source");
        Ok(path)
    }

    /// List every directory in the cache.
    pub fn list_cached(&self) -> Result<Vec<CachedClone>> {
        let native = self.root.to_native();
        let entries = match fs::read_dir(&native) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(aimgr_fs::Error::io(&native, e).into()),
        };

        let mut clones = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| aimgr_fs::Error::io(&native, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().into_owned();
            let path = self.root.join(&key);
            let url = Repository::open(path.to_native()).ok().and_then(|repo| {
                repo.find_remote("origin")
                    .ok()
                    .and_then(|remote| remote.url().map(str::to_string))
            });
            clones.push(CachedClone { key, path, url });
        }
        clones.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(clones)
    }

    /// Remove cached clones whose key is not in `referenced`.
    ///
    /// Returns the clones that were (or, in dry run, would be) removed.
    pub fn prune(&self, referenced: &[String], dry_run: bool) -> Result<Vec<CachedClone>> {
        let mut pruned = Vec::new();
        for clone in self.list_cached()? {
            if referenced.contains(&clone.key) {
                continue;
            }
            if !dry_run {
                io::remove_entry(&clone.path)?;
                tracing::info!(path = %clone.path, "pruned cached clone");
            }
            pruned.push(clone);
        }
        Ok(pruned)
    }
}

/// Clone `url` into `dest` and check out `reference` when given.
pub fn clone_repo(url: &str, dest: &NormalizedPath, reference: Option<&str>) -> Result<()> {
    let native = dest.to_native();
    if let Some(parent) = native.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Clone {
            url: url.to_string(),
            message: format!("Failed to create directory: {}", e),
        })?;
    }

    let repo = RepoBuilder::new()
        .clone(url, &native)
        .map_err(|e| Error::Clone {
            url: url.to_string(),
            message: e.message().to_string(),
        })?;

    if let Some(reference) = reference {
        checkout_ref(&repo, url, reference)?;
    }

    Ok(())
}

fn fetch_origin(repo: &Repository) -> Result<()> {
    let mut remote = repo.find_remote("origin")?;
    remote.fetch(
        &[
            "+refs/heads/*:refs/remotes/origin/*",
            "+refs/tags/*:refs/tags/*",
        ],
        None,
        None,
    )?;
    Ok(())
}

fn checkout(repo: &Repository, url: &str, reference: Option<&str>) -> Result<()> {
    match reference {
        Some(reference) => checkout_ref(repo, url, reference),
        None => reset_to_remote_head(repo),
    }
}

/// Detach HEAD at `reference`, preferring the remote branch of that name
/// over local refs, tags, and commit ids.
fn checkout_ref(repo: &Repository, url: &str, reference: &str) -> Result<()> {
    let object = [format!("origin/{reference}"), reference.to_string()]
        .iter()
        .find_map(|spec| repo.revparse_single(spec).ok())
        .ok_or_else(|| Error::RefNotFound {
            url: url.to_string(),
            reference: reference.to_string(),
        })?;

    let commit = object.peel_to_commit()?;
    let mut options = CheckoutBuilder::new();
    options.force();
    repo.checkout_tree(commit.as_object(), Some(&mut options))?;
    repo.set_head_detached(commit.id())?;

    Ok(())
}

/// Move the checked-out branch to the fetched tip of the remote default branch.
fn reset_to_remote_head(repo: &Repository) -> Result<()> {
    let remote_head = repo
        .find_reference("refs/remotes/origin/HEAD")
        .ok()
        .and_then(|r| r.resolve().ok())
        .and_then(|r| r.target());

    let target = match remote_head {
        Some(oid) => Some(oid),
        None => {
            let head = repo.head()?;
            match head.shorthand() {
                Some(branch) if head.is_branch() => repo
                    .revparse_single(&format!("origin/{branch}"))
                    .ok()
                    .map(|o| o.id()),
                _ => None,
            }
        }
    };

    if let Some(oid) = target {
        let object = repo.find_object(oid, None)?;
        repo.reset(&object, ResetType::Hard, None)?;
    }

    Ok(())
}
