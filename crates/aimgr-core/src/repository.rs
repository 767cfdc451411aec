//! Repository facade
//!
//! Ties the stores and engines together behind the operations the CLI
//! exposes, and commits the result when the root is a Git repository.

use std::fs;
use std::path::Path;

use aimgr_fs::{NormalizedPath, RepoPath, io};
use aimgr_git::{CachedClone, CommitInfo, WorkspaceCache};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::import::{ImportOptions, ImportReport, KindCounts};
use crate::location::Location;
use crate::manifest::{ImportMode, Manifest, ManifestSource};
use crate::metadata::{MetadataStore, Provenance, ResourceMetadata, SourceType};
use crate::package::Package;
use crate::pattern::Pattern;
use crate::resource::{ResourceKind, ResourceRef};
use crate::source_state::SourceState;
use crate::store::ResourceStore;
use crate::sync::{SyncEngine, SyncOptions, SyncReport};
use crate::verify::{RepairReport, Verifier, VerifyOptions, VerifyReport};
use crate::{Error, Result};

const GITIGNORE_ENTRY: &str = ".workspace/";

/// What `init` did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub root: String,
    pub created_manifest: bool,
    pub updated_gitignore: bool,
    pub initialized_git: bool,
}

/// A source to register with `add`.
#[derive(Debug, Clone, Default)]
pub struct AddSourceRequest {
    /// Local path or Git URL
    pub location: String,
    pub name: Option<String>,
    pub reference: Option<String>,
    pub subpath: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddSourceReport {
    pub source: ManifestSource,
    pub import: ImportReport,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveSourceOptions {
    pub dry_run: bool,
    pub keep_resources: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveSourceReport {
    pub source: ManifestSource,
    /// Resources owned by the source
    pub resources: Vec<ResourceRef>,
    /// Whether the owned resources were (or would be) deleted
    pub resources_removed: bool,
    pub dry_run: bool,
}

/// A resource as shown by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedResource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    pub path: NormalizedPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RemoveReport {
    pub removed: Vec<ResourceRef>,
    pub dry_run: bool,
}

/// A package to build from resources already in the repository.
#[derive(Debug, Clone, Default)]
pub struct CreatePackageRequest {
    pub name: String,
    pub description: String,
    /// References or patterns; patterns may match nothing
    pub resources: Vec<String>,
    /// Overwrite an existing package
    pub force: bool,
}

/// Repository statistics shown by `info`.
#[derive(Debug, Clone, Serialize)]
pub struct RepoInfo {
    pub root: NormalizedPath,
    pub total: usize,
    pub counts: KindCounts,
    /// Bytes used by the repository, Git history excluded
    pub disk_usage: u64,
    pub sources: Vec<SourceInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub id: String,
    pub location: String,
    pub source_type: SourceType,
    pub mode: ImportMode,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// False when a local source's directory no longer exists
    pub available: bool,
    pub last_synced: Option<DateTime<Utc>>,
    /// Resources whose metadata names this source
    pub resources: usize,
}

/// One resource as shown by `show`.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDetails {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    pub path: NormalizedPath,
    pub metadata: Option<ResourceMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<Package>,
}

/// Operations on one repository root.
#[derive(Debug, Clone)]
pub struct Repository {
    root: NormalizedPath,
}

impl Repository {
    pub fn new(root: NormalizedPath) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    fn store(&self) -> ResourceStore {
        ResourceStore::new(self.root.clone())
    }

    fn metadata(&self) -> MetadataStore {
        MetadataStore::new(self.root.clone())
    }

    fn workspace(&self) -> WorkspaceCache {
        WorkspaceCache::new(self.root.join(RepoPath::WorkspaceDir.as_str()))
    }

    pub fn is_initialized(&self) -> bool {
        Manifest::path(&self.root).is_file()
    }

    /// Create the layout, manifest, `.gitignore` and Git repository.
    /// Safe to run repeatedly.
    pub fn init(&self) -> Result<InitReport> {
        io::ensure_dir(&self.root)?;
        self.store().ensure_layout()?;

        let mut report = InitReport {
            root: self.root.to_string(),
            ..Default::default()
        };

        if !self.is_initialized() {
            Manifest::default().save(&self.root)?;
            report.created_manifest = true;
        }

        let gitignore = self.root.join(RepoPath::GitIgnore.as_str());
        let existing = match io::read_text(&gitignore) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => String::new(),
            Err(e) => return Err(e.into()),
        };
        if !existing.lines().any(|line| line.trim() == GITIGNORE_ENTRY) {
            let mut content = existing;
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(GITIGNORE_ENTRY);
            content.push('\n');
            io::write_text(&gitignore, &content)?;
            report.updated_gitignore = true;
        }

        report.initialized_git = aimgr_git::init_repository(&self.root)?;

        tracing::info!(root = %self.root, "repository initialized");
        Ok(report)
    }

    /// Delete the whole repository tree and initialize it again.
    pub fn drop_all(&self) -> Result<InitReport> {
        if io::remove_entry(&self.root)? {
            tracing::info!(root = %self.root, "repository deleted");
        }
        self.init()
    }

    /// Register a source and import its resources.
    ///
    /// The manifest entry is only persisted when the source could be
    /// resolved, and never in dry run.
    pub fn add_source(
        &self,
        request: AddSourceRequest,
        options: ImportOptions,
    ) -> Result<AddSourceReport> {
        if !options.dry_run {
            self.init()?;
        }

        let mut manifest = Manifest::load(&self.root)?;
        let source = manifest.add_source(source_from_request(request)?)?.clone();

        let dry_run = options.dry_run;
        let engine = SyncEngine::new(self.root.clone());
        let (import, _) = engine.import_source(&source, options)?;

        if !dry_run {
            manifest.save(&self.root)?;
            self.record_sync(&source);
            let message = format!("aimgr: add source {} ({})", source.name, import.summary());
            self.commit(&message);
        }

        Ok(AddSourceReport { source, import })
    }

    /// Unregister a source, deleting the resources it owns unless
    /// `keep_resources` is set.
    pub fn remove_source(
        &self,
        identifier: &str,
        options: RemoveSourceOptions,
    ) -> Result<RemoveSourceReport> {
        let mut manifest = Manifest::load(&self.root)?;
        let source = manifest
            .get_source(identifier)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("source '{identifier}'")))?;
        let key = source.key();

        let mut resources: Vec<ResourceRef> = self
            .metadata()
            .scan()?
            .records
            .into_iter()
            .filter(|stored| key.owns(&stored.record))
            .map(|stored| stored.record.resource_ref())
            .collect();
        resources.sort();
        resources.dedup();

        let report = RemoveSourceReport {
            source: source.clone(),
            resources_removed: !options.keep_resources,
            resources,
            dry_run: options.dry_run,
        };
        if options.dry_run {
            return Ok(report);
        }

        manifest.remove_source(&source.id)?;
        manifest.save(&self.root)?;

        match SourceState::load(&self.root) {
            Ok(mut state) => {
                if state.remove(&source.name) {
                    if let Err(e) = state.save(&self.root) {
                        tracing::warn!(error = %e, "could not update source state");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not read source state"),
        }

        if !options.keep_resources {
            let store = self.store();
            let metadata = self.metadata();
            for reference in &report.resources {
                store.remove(reference.kind, &reference.name)?;
                metadata.delete(reference.kind, &reference.name)?;
            }
        }

        tracing::info!(source = %source.name, resources = report.resources.len(), "removed source");
        self.commit(&format!("aimgr: remove source {}", source.name));
        Ok(report)
    }

    /// Sync every manifest source.
    pub fn sync(&self, options: SyncOptions) -> Result<SyncReport> {
        let dry_run = options.dry_run;
        let report = SyncEngine::new(self.root.clone()).sync(options)?;
        if !dry_run && report.changed() {
            self.commit(&format!("aimgr: sync ({})", report.summary()));
        }
        Ok(report)
    }

    /// Every resource in the content tree, optionally filtered.
    pub fn list(&self, pattern: Option<&Pattern>) -> Result<Vec<ListedResource>> {
        let metadata = self.metadata();
        let listed = self
            .store()
            .list()?
            .into_iter()
            .filter(|r| pattern.is_none_or(|p| p.matches(r.kind, &r.name)))
            .map(|r| {
                let source_name = metadata
                    .load(r.kind, &r.name)
                    .ok()
                    .flatten()
                    .and_then(|m| m.source_name);
                ListedResource {
                    kind: r.kind,
                    name: r.name,
                    path: r.path,
                    source_name,
                }
            })
            .collect();
        Ok(listed)
    }

    /// Remove every resource matching any of `patterns`, with its metadata.
    ///
    /// A plain reference that matches nothing fails the whole call before
    /// anything is deleted.
    pub fn remove_resources(&self, patterns: &[String], dry_run: bool) -> Result<RemoveReport> {
        let store = self.store();
        let listing: Vec<ResourceRef> = store.list()?.iter().map(|r| r.resource_ref()).collect();

        let mut targets: Vec<ResourceRef> = Vec::new();
        for input in patterns {
            let pattern = Pattern::new(input)?;
            let matched = pattern.filter(&listing);
            if matched.is_empty() && !pattern.is_pattern() {
                return Err(Error::NotFound(format!("resource '{input}'")));
            }
            for reference in matched {
                if !targets.contains(&reference) {
                    targets.push(reference);
                }
            }
        }

        if !dry_run {
            let metadata = self.metadata();
            for reference in &targets {
                store.remove(reference.kind, &reference.name)?;
                metadata.delete(reference.kind, &reference.name)?;
                tracing::info!(resource = %reference, "removed resource");
            }
            if !targets.is_empty() {
                self.commit(&format!("aimgr: remove {} resource(s)", targets.len()));
            }
        }

        Ok(RemoveReport {
            removed: targets,
            dry_run,
        })
    }

    /// Write a package whose members are resources already in the store.
    ///
    /// Patterns are expanded against the current content; a plain reference
    /// that matches nothing fails before anything is written.
    pub fn create_package(&self, request: CreatePackageRequest) -> Result<Package> {
        let store = self.store();
        let listing: Vec<ResourceRef> = store
            .list()?
            .iter()
            .map(|r| r.resource_ref())
            .filter(|r| r.kind != ResourceKind::Package)
            .collect();

        let mut resources: Vec<String> = Vec::new();
        for input in &request.resources {
            let pattern = Pattern::new(input)?;
            if pattern.kind() == Some(ResourceKind::Package) {
                return Err(Error::invalid(
                    "package",
                    format!("'{input}': a package cannot contain packages"),
                ));
            }
            let matched = pattern.filter(&listing);
            if matched.is_empty() && !pattern.is_pattern() {
                return Err(Error::NotFound(format!("resource '{input}'")));
            }
            for reference in matched {
                let reference = reference.to_string();
                if !resources.contains(&reference) {
                    resources.push(reference);
                }
            }
        }
        if resources.is_empty() {
            return Err(Error::invalid("package", "no resources selected"));
        }

        let package = Package {
            name: request.name,
            description: request.description,
            resources,
        };
        package.validate()?;

        if store.exists(ResourceKind::Package, &package.name) && !request.force {
            return Err(Error::Conflict {
                kind: ResourceKind::Package,
                name: package.name,
            });
        }

        // An imported package may be a link into its source
        let path = store.path_of(ResourceKind::Package, &package.name);
        io::remove_entry(&path)?;
        package.save(&path)?;

        let metadata = self.metadata();
        let provenance = Provenance::manual();
        let now = Utc::now();
        let record = match metadata.load(ResourceKind::Package, &package.name)? {
            Some(mut existing) => {
                existing.refresh(&provenance, now);
                existing
            }
            None => ResourceMetadata::new(ResourceKind::Package, &package.name, &provenance, now),
        };
        metadata.save(&record)?;

        tracing::info!(package = %package.name, resources = package.resources.len(), "created package");
        self.commit(&format!("aimgr: create package {}", package.name));
        Ok(package)
    }

    /// Resource counts, disk usage and per-source status.
    pub fn info(&self) -> Result<RepoInfo> {
        if !self.is_initialized() {
            return Err(Error::NotFound(format!("repository at {}", self.root)));
        }
        let manifest = Manifest::load(&self.root)?;
        let resources = self.store().list()?;
        let records = self.metadata().scan()?.records;
        let state = SourceState::load(&self.root).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable source state");
            SourceState::default()
        });

        let mut counts = KindCounts::default();
        for resource in &resources {
            counts.bump(resource.kind);
        }

        let sources = manifest
            .sources
            .iter()
            .map(|source| {
                let key = source.key();
                SourceInfo {
                    name: source.name.clone(),
                    id: source.id.clone(),
                    location: source.location().to_string(),
                    source_type: source.source_type(),
                    mode: source.mode(),
                    reference: source.reference.clone(),
                    available: source.path.as_deref().is_none_or(|p| Path::new(p).is_dir()),
                    last_synced: state.get(&source.name).and_then(|s| s.last_synced),
                    resources: records.iter().filter(|r| key.owns(&r.record)).count(),
                }
            })
            .collect();

        Ok(RepoInfo {
            root: self.root.clone(),
            total: resources.len(),
            counts,
            disk_usage: io::disk_usage(&self.root.to_native(), &[".git"])?,
            sources,
        })
    }

    /// Content path, metadata and package contents of every matching resource.
    pub fn show(&self, pattern: &Pattern) -> Result<Vec<ResourceDetails>> {
        let metadata = self.metadata();
        let details: Vec<ResourceDetails> = self
            .store()
            .list()?
            .into_iter()
            .filter(|r| pattern.matches(r.kind, &r.name))
            .map(|r| {
                let record = metadata.load(r.kind, &r.name).unwrap_or_else(|e| {
                    tracing::warn!(resource = %r.resource_ref(), error = %e, "unreadable metadata");
                    None
                });
                let package = (r.kind == ResourceKind::Package)
                    .then(|| Package::load(&r.path))
                    .transpose()
                    .unwrap_or_else(|e| {
                        tracing::warn!(path = %r.path, error = %e, "unreadable package");
                        None
                    });
                ResourceDetails {
                    kind: r.kind,
                    name: r.name,
                    path: r.path,
                    metadata: record,
                    package,
                }
            })
            .collect();

        if details.is_empty() {
            return Err(Error::NotFound(format!(
                "no resources matching '{}'",
                pattern.as_str()
            )));
        }
        Ok(details)
    }

    pub fn verify(&self, options: VerifyOptions) -> Result<VerifyReport> {
        let commit = options.fix && !options.dry_run;
        let report = Verifier::new(self.root.clone()).verify(options)?;
        if commit && !report.fixes.is_empty() {
            self.commit("aimgr: fix repository metadata");
        }
        Ok(report)
    }

    pub fn repair(&self, dry_run: bool) -> Result<RepairReport> {
        let report = Verifier::new(self.root.clone()).repair(dry_run)?;
        if !dry_run && report.fixed_count > 0 {
            self.commit(&format!("aimgr: repair repository ({})", report.summary()));
        }
        Ok(report)
    }

    /// Remove cached clones no manifest URL source refers to.
    pub fn prune(&self, dry_run: bool) -> Result<Vec<CachedClone>> {
        let manifest = Manifest::load(&self.root)?;
        let referenced: Vec<String> = manifest
            .sources
            .iter()
            .filter_map(|s| {
                s.url
                    .as_deref()
                    .map(|url| WorkspaceCache::cache_key(url, s.reference.as_deref()))
            })
            .collect();
        Ok(self.workspace().prune(&referenced, dry_run)?)
    }

    /// Stage and commit everything; failures are logged, never returned.
    pub fn commit(&self, message: &str) -> Option<CommitInfo> {
        if !aimgr_git::is_repository(&self.root) {
            return None;
        }
        match aimgr_git::commit_all(&self.root, message) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(error = %e, "failed to commit changes");
                None
            }
        }
    }

    fn record_sync(&self, source: &ManifestSource) {
        let result = SourceState::load(&self.root).and_then(|mut state| {
            state.record_sync(&source.name, &source.id, chrono::Utc::now());
            state.save(&self.root)
        });
        if let Err(e) = result {
            tracing::warn!(source = %source.name, error = %e, "could not update source state");
        }
    }
}

fn source_from_request(request: AddSourceRequest) -> Result<ManifestSource> {
    let (source, reference, subpath) = match Location::parse(&request.location)? {
        Location::Remote {
            url,
            reference,
            subpath,
        } => (ManifestSource::from_url(url), reference, subpath),
        Location::Local(path) => {
            let absolute = NormalizedPath::absolute(&path)?;
            if !fs::metadata(absolute.to_native()).is_ok_and(|m| m.is_dir()) {
                return Err(Error::unavailable(
                    path,
                    format!("not a directory: {absolute}"),
                ));
            }
            (ManifestSource::from_path(absolute.as_str()), None, None)
        }
    };

    // Explicit --ref/--subpath win over the ones embedded in the location
    Ok(source
        .with_name(request.name.unwrap_or_default())
        .with_ref(request.reference.or(reference))
        .with_subpath(request.subpath.or(subpath)))
}
