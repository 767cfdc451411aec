//! Repository consistency and synchronization engine for aimgr
//!
//! This crate owns the on-disk repository of AI resources (commands,
//! skills, agents and packages) and keeps three views of it consistent:
//!
//! - **Content store**: resource files under `commands/`, `skills/`,
//!   `agents/` and `packages/`
//! - **Metadata store**: one provenance record per resource under
//!   `.metadata/`
//! - **Manifest**: the declared sources in `ai.repo.yaml`
//!
//! # Architecture
//!
//! ```text
//!                       CLI
//!                        |
//!                   Repository
//!                        |
//!      +---------+-------+--------+----------+
//!      |         |                |          |
//!  SyncEngine  BulkImporter    Verifier   Manifest
//!      |         |                |
//!  Discovery  ResourceStore  MetadataStore
//!      |
//!  SourceResolver --- aimgr-git (clone cache)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use aimgr_core::{Repository, SyncOptions};
//! use aimgr_fs::NormalizedPath;
//!
//! fn example() -> aimgr_core::Result<()> {
//!     let repo = Repository::new(NormalizedPath::new("/path/to/repo"));
//!     repo.init()?;
//!     let report = repo.sync(SyncOptions::default())?;
//!     report.ensure_success()
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod import;
pub mod location;
pub mod manifest;
pub mod metadata;
pub mod package;
pub mod pattern;
pub mod repository;
pub mod resource;
pub mod source_state;
pub mod store;
pub mod sync;
pub mod verify;

pub use config::{AppConfig, ConfigResolver};
pub use discovery::{Candidate, Discovered, Discovery, LayoutDiscovery, PackageCandidate};
pub use error::{Error, Result};
pub use import::{BulkImporter, ImportEntry, ImportOptions, ImportReport, KindCounts};
pub use location::{Location, is_remote};
pub use manifest::{ImportMode, Manifest, ManifestSource, SourceKey};
pub use metadata::{MetadataStore, Provenance, ResourceMetadata, SourceType};
pub use package::Package;
pub use pattern::{Pattern, is_pattern};
pub use repository::{
    AddSourceReport, AddSourceRequest, CreatePackageRequest, InitReport, ListedResource,
    RemoveReport, RemoveSourceOptions, RemoveSourceReport, RepoInfo, Repository, ResourceDetails,
    SourceInfo,
};
pub use resource::{ResourceKind, ResourceRef};
pub use source_state::{SourceState, SourceSyncState};
pub use store::{ResourceStore, StoredResource};
pub use sync::{
    CacheResolver, Removal, SourceOutcome, SourceResolver, SourceStatus, SyncEngine, SyncOptions,
    SyncReport,
};
pub use verify::{RepairReport, VerifyOptions, VerifyReport, Verifier};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_error_suggests_policies() {
        let error = Error::Conflict {
            kind: ResourceKind::Skill,
            name: "pdf".into(),
        };

        let display = error.to_string();
        assert!(display.contains("skill 'pdf' already exists"), "got: {display}");
        assert!(display.contains("force"), "got: {display}");
    }

    #[test]
    fn all_sources_failed_reports_count() {
        let error = Error::AllSourcesFailed { count: 2 };
        assert_eq!(error.to_string(), "All 2 source(s) failed to sync");
    }

    #[test]
    fn fs_errors_convert() {
        let fs_error = aimgr_fs::Error::io("/x", std::io::Error::other("boom"));
        let error: Error = fs_error.into();
        assert!(matches!(error, Error::Fs(_)));
    }

    #[test]
    fn parse_errors_convert_transparently() {
        let json = serde_json::from_str::<Manifest>("{").unwrap_err();
        let message = json.to_string();
        let error: Error = json.into();
        assert!(matches!(error, Error::Json(_)));
        assert_eq!(error.to_string(), message);

        let yaml = serde_yaml::from_str::<Manifest>("version: [").unwrap_err();
        assert!(matches!(Error::from(yaml), Error::Yaml(_)));
    }
}
