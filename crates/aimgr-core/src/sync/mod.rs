//! Declarative multi-source synchronization
//!
//! This module provides:
//! - **resolver**: turn a manifest source into a local directory (clone cache or path)
//! - **engine**: import every source, then remove resources that disappeared from it
//! - **report**: per-source outcomes and the removal list

mod engine;
mod report;
mod resolver;

pub use engine::{SyncEngine, SyncOptions};
pub use report::{Removal, SourceOutcome, SourceStatus, SyncReport};
pub use resolver::{CacheResolver, SourceResolver};
