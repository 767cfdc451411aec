//! Recording repository changes as Git commits.

use aimgr_fs::{NormalizedPath, RepoPath};
use chrono::{DateTime, TimeZone, Utc};
use git2::{ErrorCode, IndexAddOption, Repository, Signature};

use crate::Result;

/// Information about a commit that was created.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// Short commit hash (7 characters)
    pub hash: String,

    /// First line of the commit message
    pub message: String,

    pub author: String,

    pub timestamp: DateTime<Utc>,
}

pub fn is_repository(root: &NormalizedPath) -> bool {
    root.join(RepoPath::GitDir.as_str()).exists()
}

/// Initialize a Git repository at `root` unless one already exists.
///
/// Returns true when a repository was created.
pub fn init_repository(root: &NormalizedPath) -> Result<bool> {
    if is_repository(root) {
        return Ok(false);
    }
    Repository::init(root.to_native())?;
    tracing::debug!(path = %root, "initialized git repository");
    Ok(true)
}

/// Stage every change under `root` (honoring `.gitignore`) and commit it.
///
/// Returns `Ok(None)` when `root` is not a Git repository or nothing changed.
pub fn commit_all(root: &NormalizedPath, message: &str) -> Result<Option<CommitInfo>> {
    let repo = match Repository::open(root.to_native()) {
        Ok(repo) => repo,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;
    let tree_id = index.write_tree()?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let unchanged = match &parent {
        Some(parent) => parent.tree_id() == tree_id,
        None => index.is_empty(),
    };
    if unchanged {
        return Ok(None);
    }

    let tree = repo.find_tree(tree_id)?;
    let signature = repo
        .signature()
        .or_else(|_| Signature::now("aimgr", "aimgr@localhost"))?;
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;

    let timestamp = Utc
        .timestamp_opt(signature.when().seconds(), 0)
        .single()
        .unwrap_or_default();
    let info = CommitInfo {
        hash: format!("{:.7}", oid),
        message: message.lines().next().unwrap_or("").to_string(),
        author: signature.name().unwrap_or("Unknown").to_string(),
        timestamp,
    };
    tracing::debug!(hash = %info.hash, message = %info.message, "committed repository changes");

    Ok(Some(info))
}
