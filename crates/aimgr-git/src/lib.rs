//! Git support for the aimgr resource repository
//!
//! Remote sources are materialized through a clone cache under `.workspace/`,
//! and repository mutations can be recorded as commits.

pub mod commits;
pub mod error;
pub mod url;
pub mod workspace;

pub use commits::{CommitInfo, commit_all, init_repository, is_repository};
pub use error::{Error, Result};
pub use url::normalize_url;
pub use workspace::{CachedClone, WorkspaceCache};
