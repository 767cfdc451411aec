//! Shared test utilities for the aimgr workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: git repositories used as remote sources
//! - [`repo`]: [`SourceTree`] and [`TestRepo`] builders plus tree snapshots

pub mod git;
pub mod repo;

pub use repo::{SourceTree, TestRepo, snapshot_tree};
