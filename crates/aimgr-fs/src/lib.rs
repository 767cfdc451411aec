//! Filesystem primitives for the aimgr resource repository
//!
//! Provides normalized path handling, atomic writes, copy/symlink helpers used
//! to materialize resources, and format-agnostic config loading.

pub mod config;
pub mod digest;
pub mod error;
pub mod io;
pub mod layout;
pub mod path;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use layout::RepoPath;
pub use path::NormalizedPath;
