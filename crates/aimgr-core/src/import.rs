//! Bulk import engine
//!
//! Resolves discovered candidates into store mutations. Each candidate is
//! classified as add, update, skip or fail; a failure is recorded on the
//! report and never stops the batch.

use std::path::Path;

use aimgr_fs::NormalizedPath;
use chrono::Utc;
use serde::Serialize;

use crate::discovery::{Candidate, Discovered, PackageCandidate};
use crate::manifest::ImportMode;
use crate::metadata::{MetadataStore, Provenance, ResourceMetadata};
use crate::pattern::Pattern;
use crate::resource::ResourceKind;
use crate::store::ResourceStore;
use crate::{Error, Result};

/// Options for one import call.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Overwrite existing resources
    pub force: bool,
    /// Keep existing resources and report them as skipped
    pub skip_existing: bool,
    /// Classify without touching the stores
    pub dry_run: bool,
    /// Only import candidates matching this pattern
    pub filter: Option<Pattern>,
    pub mode: ImportMode,
    /// Provenance for written metadata; `None` records a `file` import
    pub origin: Option<Provenance>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            force: false,
            skip_existing: false,
            dry_run: false,
            filter: None,
            mode: ImportMode::Copy,
            origin: None,
        }
    }
}

/// One classified candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEntry {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ImportEntry {
    fn new(kind: ResourceKind, name: &str, path: &Path, message: impl ToString) -> Self {
        Self {
            kind,
            name: name.to_string(),
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

/// Resources imported per kind (added plus updated).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub commands: usize,
    pub skills: usize,
    pub agents: usize,
    pub packages: usize,
}

impl KindCounts {
    pub(crate) fn bump(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::Command => self.commands += 1,
            ResourceKind::Skill => self.skills += 1,
            ResourceKind::Agent => self.agents += 1,
            ResourceKind::Package => self.packages += 1,
        }
    }
}

/// Outcome of an import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub added: Vec<ImportEntry>,
    pub updated: Vec<ImportEntry>,
    pub skipped: Vec<ImportEntry>,
    pub failed: Vec<ImportEntry>,
    pub counts: KindCounts,
    pub dry_run: bool,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.added.len() + self.updated.len() + self.skipped.len() + self.failed.len()
    }

    /// Whether anything was (or in dry run would be) written.
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} added, {} updated, {} skipped, {} failed",
            self.added.len(),
            self.updated.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }

    /// Fold another report's outcomes into this one.
    pub fn merge(&mut self, other: ImportReport) {
        self.added.extend(other.added);
        self.updated.extend(other.updated);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
        self.counts.commands += other.counts.commands;
        self.counts.skills += other.counts.skills;
        self.counts.agents += other.counts.agents;
        self.counts.packages += other.counts.packages;
    }
}

enum Outcome {
    Added,
    Updated,
    Skipped,
}

/// Applies discovered resources to a repository's stores.
pub struct BulkImporter {
    store: ResourceStore,
    metadata: MetadataStore,
}

impl BulkImporter {
    pub fn new(repo_root: NormalizedPath) -> Self {
        Self {
            store: ResourceStore::new(repo_root.clone()),
            metadata: MetadataStore::new(repo_root),
        }
    }

    /// Import every candidate, then every package.
    pub fn import(&self, discovered: &Discovered, options: ImportOptions) -> ImportReport {
        let mut report = ImportReport {
            dry_run: options.dry_run,
            ..Default::default()
        };

        let mut candidates: Vec<&Candidate> = discovered.candidates.iter().collect();
        candidates.sort_by_key(|c| c.kind);

        for candidate in candidates {
            if !accepts(&options, candidate.kind, &candidate.name) {
                continue;
            }
            self.record(
                &mut report,
                candidate.kind,
                &candidate.name,
                &candidate.content_path,
                &options,
            );
        }

        for package in &discovered.packages {
            if !accepts(&options, ResourceKind::Package, &package.package.name) {
                continue;
            }
            self.record(
                &mut report,
                ResourceKind::Package,
                &package.package.name,
                &package.path,
                &options,
            );
            self.warn_missing_references(package, discovered, &options);
        }

        for invalid in &discovered.invalid {
            if !accepts(&options, invalid.kind, &invalid.name) {
                continue;
            }
            report.failed.push(ImportEntry::new(
                invalid.kind,
                &invalid.name,
                &invalid.path,
                &invalid.error,
            ));
        }

        tracing::info!(summary = %report.summary(), dry_run = options.dry_run, "import finished");
        report
    }

    fn record(
        &self,
        report: &mut ImportReport,
        kind: ResourceKind,
        name: &str,
        content: &Path,
        options: &ImportOptions,
    ) {
        match self.import_one(kind, name, content, options) {
            Ok(Outcome::Added) => {
                report.counts.bump(kind);
                report.added.push(ImportEntry::new(kind, name, content, ""));
            }
            Ok(Outcome::Updated) => {
                report.counts.bump(kind);
                report.updated.push(ImportEntry::new(kind, name, content, ""));
            }
            Ok(Outcome::Skipped) => {
                report
                    .skipped
                    .push(ImportEntry::new(kind, name, content, "already exists"));
            }
            Err(e) => {
                tracing::warn!(kind = %kind, name, error = %e, "import failed");
                report
                    .failed
                    .push(ImportEntry::new(kind, name, content, e.to_string()));
            }
        }
    }

    fn import_one(
        &self,
        kind: ResourceKind,
        name: &str,
        content: &Path,
        options: &ImportOptions,
    ) -> Result<Outcome> {
        let exists = self.store.exists(kind, name);
        let outcome = match (exists, options.skip_existing, options.force) {
            (false, _, _) => Outcome::Added,
            (true, true, _) => return Ok(Outcome::Skipped),
            (true, false, true) => Outcome::Updated,
            (true, false, false) => {
                return Err(Error::Conflict {
                    kind,
                    name: name.to_string(),
                });
            }
        };

        if let Some(other) = self.metadata.slug_owner(kind, name)? {
            return Err(Error::Inconsistent(format!(
                "metadata for {kind} '{name}' would overwrite the record of '{other}'"
            )));
        }

        if options.dry_run {
            return Ok(outcome);
        }

        let provenance = match &options.origin {
            Some(origin) => origin.clone(),
            None => Provenance::file(&NormalizedPath::absolute(content)?),
        };
        let now = Utc::now();

        // Content first: an interrupted import leaves a resource without
        // metadata, which repair can recreate.
        self.store.install(kind, name, content, options.mode)?;

        let record = match self.metadata.load(kind, name)? {
            Some(mut existing) => {
                existing.refresh(&provenance, now);
                existing
            }
            None => ResourceMetadata::new(kind, name, &provenance, now),
        };
        self.metadata.save(&record)?;

        Ok(outcome)
    }

    fn warn_missing_references(
        &self,
        package: &PackageCandidate,
        discovered: &Discovered,
        options: &ImportOptions,
    ) {
        let incoming = discovered.refs();
        let missing = package
            .package
            .missing_references(|r| self.store.contains(r) || (options.dry_run && incoming.contains(r)));
        if !missing.is_empty() {
            tracing::warn!(
                package = %package.package.name,
                missing = ?missing,
                "package references resources that are not in the repository"
            );
        }
    }
}

fn accepts(options: &ImportOptions, kind: ResourceKind, name: &str) -> bool {
    options
        .filter
        .as_ref()
        .is_none_or(|pattern| pattern.matches(kind, name))
}
