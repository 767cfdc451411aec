//! Verification and repair of the resource store against its metadata
//!
//! Issue classes and how they are handled:
//!
//! | issue                      | severity | repaired by `fix`           |
//! |----------------------------|----------|-----------------------------|
//! | resource without metadata  | warning  | create `unknown` metadata   |
//! | orphaned metadata          | error    | delete the record           |
//! | missing source path        | warning  | no                          |
//! | type mismatch              | error    | no                          |
//! | package with missing refs  | error    | no                          |
//! | unreadable metadata file   | error    | no                          |

mod report;

pub use report::{
    MetadataIssue, PackageIssue, RepairReport, ResourceIssue, TypeMismatch, VerifyReport,
};

use std::fs;

use aimgr_fs::NormalizedPath;
use chrono::{DateTime, Utc};

use crate::metadata::{MetadataStore, Provenance, ResourceMetadata, SourceType};
use crate::package::Package;
use crate::pattern::Pattern;
use crate::resource::ResourceKind;
use crate::store::ResourceStore;
use crate::{Error, Result};

/// Options for a verification run
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Repair missing and orphaned metadata
    pub fix: bool,
    /// With `fix`, only report what would be repaired
    pub dry_run: bool,
    /// Restrict the check to matching resources
    pub filter: Option<Pattern>,
}

/// Cross-checks a repository's content tree and metadata directory.
pub struct Verifier {
    store: ResourceStore,
    metadata: MetadataStore,
}

/// Outcome of applying the fixable repairs.
#[derive(Default)]
struct Repairs {
    created: Vec<ResourceIssue>,
    removed: Vec<MetadataIssue>,
    actions: Vec<String>,
    errors: Vec<String>,
}

impl Verifier {
    pub fn new(repo_root: NormalizedPath) -> Self {
        Self {
            store: ResourceStore::new(repo_root.clone()),
            metadata: MetadataStore::new(repo_root),
        }
    }

    pub fn verify(&self, options: VerifyOptions) -> Result<VerifyReport> {
        let mut report = self.inspect(options.filter.as_ref())?;

        if options.fix {
            let repairs = self.apply(&report, options.dry_run);
            report.fixes = repairs.actions;
            report.fix_errors = repairs.errors;
            report.metadata_created = repairs.created;
            report.orphaned_removed = repairs.removed;
        }

        report.has_warnings = report.remaining_without_metadata().next().is_some()
            || !report.missing_source_paths.is_empty();
        report.has_errors = report.remaining_orphaned().next().is_some()
            || report.unfixable_count() > 0
            || !report.fix_errors.is_empty();

        tracing::info!(
            summary = %report.summary(),
            has_errors = report.has_errors,
            has_warnings = report.has_warnings,
            "verification finished"
        );
        Ok(report)
    }

    /// Verify the whole repository and apply every fixable repair.
    pub fn repair(&self, dry_run: bool) -> Result<RepairReport> {
        let report = self.inspect(None)?;
        let repairs = self.apply(&report, dry_run);

        let fixed_count = if dry_run {
            report.fixable_count()
        } else {
            repairs.created.len() + repairs.removed.len()
        };
        let (metadata_created, orphaned_removed) = if dry_run {
            (report.resources_without_metadata.clone(), report.orphaned_metadata.clone())
        } else {
            (repairs.created, repairs.removed)
        };

        Ok(RepairReport {
            dry_run,
            metadata_created,
            orphaned_removed,
            unfixable_count: report.unfixable_count(),
            type_mismatches: report.type_mismatches,
            packages_with_missing_refs: report.packages_with_missing_refs,
            unreadable_metadata: report.unreadable_metadata,
            actions: repairs.actions,
            errors: repairs.errors,
            fixed_count,
        })
    }

    fn inspect(&self, filter: Option<&Pattern>) -> Result<VerifyReport> {
        let selected = |kind: ResourceKind, name: &str| filter.is_none_or(|p| p.matches(kind, name));
        let mut report = VerifyReport::default();

        let resources: Vec<_> = self
            .store
            .list()?
            .into_iter()
            .filter(|r| selected(r.kind, &r.name))
            .collect();

        for resource in &resources {
            match self.metadata.load(resource.kind, &resource.name) {
                Ok(Some(_)) => {}
                Ok(None) => report.resources_without_metadata.push(ResourceIssue {
                    name: resource.name.clone(),
                    kind: resource.kind,
                    path: resource.path.to_string(),
                }),
                // Reported below as unreadable metadata
                Err(_) => {}
            }
        }

        let scan = self.metadata.scan()?;
        for stored in &scan.records {
            let record = &stored.record;
            if !selected(stored.location, &record.name) {
                continue;
            }

            if record.kind != stored.location {
                report.type_mismatches.push(TypeMismatch {
                    name: record.name.clone(),
                    resource_type: stored.location,
                    metadata_type: record.kind,
                    resource_path: self.store.path_of(stored.location, &record.name).to_string(),
                    metadata_path: stored.path.to_string(),
                });
                continue;
            }

            let source_path = record.local_source_path();
            if !self.store.exists(record.kind, &record.name) {
                report.orphaned_metadata.push(MetadataIssue {
                    name: record.name.clone(),
                    kind: record.kind,
                    path: stored.path.to_string(),
                    source_path: source_path.map(|p| p.display().to_string()),
                });
                continue;
            }

            if let Some(source_path) = source_path.filter(|p| !p.exists()) {
                report.missing_source_paths.push(MetadataIssue {
                    name: record.name.clone(),
                    kind: record.kind,
                    path: stored.path.to_string(),
                    source_path: Some(source_path.display().to_string()),
                });
            }
        }
        report.unreadable_metadata = scan.unreadable.iter().map(ToString::to_string).collect();

        for resource in resources.iter().filter(|r| r.kind == ResourceKind::Package) {
            let package = match Package::load(&resource.path) {
                Ok(package) => package,
                Err(e) => {
                    tracing::warn!(path = %resource.path, error = %e, "skipping unreadable package");
                    continue;
                }
            };
            let missing = package.missing_references(|r| self.store.contains(r));
            if !missing.is_empty() {
                report.packages_with_missing_refs.push(PackageIssue {
                    name: package.name,
                    path: resource.path.to_string(),
                    missing_resources: missing,
                });
            }
        }

        Ok(report)
    }

    fn apply(&self, report: &VerifyReport, dry_run: bool) -> Repairs {
        let mut repairs = Repairs::default();

        for issue in &report.resources_without_metadata {
            let reference = format!("{}/{}", issue.kind, issue.name);
            if dry_run {
                repairs
                    .actions
                    .push(format!("[dry-run] Would create metadata for {reference}"));
                continue;
            }
            match self.recreate_metadata(issue) {
                Ok(()) => {
                    repairs.actions.push(format!("Created metadata for {reference}"));
                    repairs.created.push(issue.clone());
                }
                Err(e) => repairs
                    .errors
                    .push(format!("Failed to create metadata for {reference}: {e}")),
            }
        }

        for issue in &report.orphaned_metadata {
            if dry_run {
                repairs
                    .actions
                    .push(format!("[dry-run] Would remove orphaned metadata {}", issue.path));
                continue;
            }
            match self.metadata.delete_path(&NormalizedPath::new(&issue.path)) {
                Ok(_) => {
                    repairs
                        .actions
                        .push(format!("Removed orphaned metadata {}", issue.path));
                    repairs.removed.push(issue.clone());
                }
                Err(e) => repairs
                    .errors
                    .push(format!("Failed to remove {}: {e}", issue.path)),
            }
        }

        repairs
    }

    fn recreate_metadata(&self, issue: &ResourceIssue) -> Result<()> {
        if let Some(other) = self.metadata.slug_owner(issue.kind, &issue.name)? {
            return Err(Error::Inconsistent(format!(
                "metadata file is already used by '{other}'"
            )));
        }
        let provenance = Provenance {
            source_type: SourceType::Unknown,
            source_url: String::new(),
            source_name: None,
            source_id: None,
            reference: None,
        };
        let modified: DateTime<Utc> = fs::symlink_metadata(&issue.path)
            .and_then(|m| m.modified())
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());

        let record = ResourceMetadata::new(issue.kind, issue.name.clone(), &provenance, modified);
        self.metadata.save(&record)?;
        tracing::info!(kind = %issue.kind, name = %issue.name, "recreated metadata");
        Ok(())
    }
}
