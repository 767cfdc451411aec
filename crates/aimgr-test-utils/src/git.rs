//! Git repositories standing in for remote sources.
//!
//! Everything goes through `git2`, so tests do not need a `git` binary.
//! Clone these by plain filesystem path; libgit2 treats it as a local remote.

use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Oid, Repository, Signature};

/// Initialise an empty repository at `path`.
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn real_git_repo(path: &Path) -> Repository {
    Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Write `files` (relative path, content) under `path` and commit all changes.
///
/// Initialises the repository first when needed. Deleted files are picked up
/// too, so tests can remove a file and call this again.
///
/// # Panics
/// Panics if any filesystem or git operation fails.
pub fn commit_files(path: &Path, files: &[(&str, &str)], message: &str) -> Oid {
    let repo = Repository::open(path).unwrap_or_else(|_| real_git_repo(path));

    for (relative, content) in files {
        let file = path.join(relative);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file, content)
            .unwrap_or_else(|e| panic!("commit_files: failed to write {}: {e}", file.display()));
    }

    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.update_all(["*"].iter(), None).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let signature = Signature::now("Test User", "test@test.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap_or_else(|e| panic!("commit_files: commit failed: {e}"))
}

/// Create a lightweight tag `name` at HEAD.
///
/// # Panics
/// Panics if HEAD cannot be resolved or the tag exists.
pub fn tag_head(path: &Path, name: &str) {
    let repo = Repository::open(path).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.tag_lightweight(name, head.as_object(), false)
        .unwrap_or_else(|e| panic!("tag_head: failed to create tag {name}: {e}"));
}
