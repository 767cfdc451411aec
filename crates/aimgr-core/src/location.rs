//! Parsing of source locations given to `add`
//!
//! Accepted forms:
//!
//! - `gh:owner/repo[@ref][/subpath]`, also `gh:owner/repo/subpath`
//! - `owner/repo` when no such local directory exists
//! - `https://github.com/owner/repo/tree/<ref>/<subpath>` (or `/blob/`)
//! - any other Git URL, taken as is
//! - `local:<path>` or a plain path

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

static OWNER_REPO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+/[A-Za-z0-9_.-]+$").unwrap());

const GITHUB_PREFIXES: &[&str] = &["https://github.com/", "http://github.com/"];

/// Schemes that mark a location as a Git remote.
pub fn is_remote(location: &str) -> bool {
    const SCHEMES: &[&str] = &["http://", "https://", "ssh://", "git://", "git@", "file://"];
    SCHEMES.iter().any(|scheme| location.starts_with(scheme))
}

/// Where a source lives, with any ref or subpath embedded in the location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote {
        url: String,
        reference: Option<String>,
        subpath: Option<String>,
    },
    Local(String),
}

impl Location {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::invalid("source", "location cannot be empty"));
        }

        if let Some(rest) = input.strip_prefix("gh:") {
            return github_shorthand(rest);
        }
        if let Some(path) = input.strip_prefix("local:") {
            if path.is_empty() {
                return Err(Error::invalid("source", "local path cannot be empty"));
            }
            return Ok(Self::Local(path.to_string()));
        }
        if let Some(path) = GITHUB_PREFIXES.iter().find_map(|p| input.strip_prefix(*p)) {
            if let Some(location) = github_tree_url(path) {
                return Ok(location);
            }
        }
        if is_remote(input) {
            return Ok(Self::Remote {
                url: input.to_string(),
                reference: None,
                subpath: None,
            });
        }
        if OWNER_REPO.is_match(input) && !Path::new(input).exists() {
            return github_shorthand(input);
        }
        Ok(Self::Local(input.to_string()))
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// `owner/repo[/subpath][@ref[/subpath]]`
fn github_shorthand(input: &str) -> Result<Location> {
    let input = input.trim_matches('/');
    let (repo_path, ref_and_path) = match input.split_once('@') {
        Some((repo_path, rest)) => (repo_path, Some(rest)),
        None => (input, None),
    };

    let mut parts = repo_path.splitn(3, '/');
    let owner = parts.next().unwrap_or_default();
    let repo = parts.next().unwrap_or_default().trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() {
        return Err(Error::invalid(
            "source",
            format!("'{input}' must have the form owner/repo"),
        ));
    }
    let mut subpath = parts.next().and_then(non_empty);

    let mut reference = None;
    if let Some(rest) = ref_and_path {
        match rest.split_once('/') {
            Some((r, path)) => {
                reference = non_empty(r);
                subpath = non_empty(path.trim_matches('/'));
            }
            None => reference = non_empty(rest),
        }
    }

    Ok(Location::Remote {
        url: format!("https://github.com/{owner}/{repo}"),
        reference,
        subpath,
    })
}

/// `owner/repo/tree/<ref>[/subpath]`; `None` when there is no tree segment.
fn github_tree_url(path: &str) -> Option<Location> {
    let path = path.trim_end_matches('/');
    let parts: Vec<&str> = path.split('/').collect();
    let [owner, repo, marker, reference, rest @ ..] = parts.as_slice() else {
        return None;
    };
    if !matches!(*marker, "tree" | "blob") || owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(Location::Remote {
        url: format!("https://github.com/{owner}/{}", repo.trim_end_matches(".git")),
        reference: non_empty(reference),
        subpath: non_empty(&rest.join("/")),
    })
}
