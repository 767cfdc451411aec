//! SyncEngine implementation
//!
//! A sync run imports every manifest source in order and then removes the
//! resources that a source used to provide but no longer does. Ownership is
//! read from the metadata directory before anything is imported, so the
//! removal set never depends on what the content tree happens to contain.

use std::collections::{BTreeSet, HashMap};

use aimgr_fs::NormalizedPath;
use chrono::Utc;

use crate::discovery::{Discovered, Discovery, LayoutDiscovery};
use crate::import::{BulkImporter, ImportOptions, ImportReport};
use crate::manifest::{Manifest, ManifestSource, SourceKey};
use crate::metadata::{MetadataScan, MetadataStore, Provenance};
use crate::resource::ResourceRef;
use crate::source_state::SourceState;
use crate::store::ResourceStore;
use crate::{Error, Result};

use super::report::{Removal, SourceOutcome, SyncReport};
use super::resolver::{CacheResolver, SourceResolver};

/// Options for sync operations
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Keep resources that already exist instead of overwriting them
    pub skip_existing: bool,
    /// If true, simulate changes without modifying the repository.
    /// Actions will be prefixed with "[dry-run] Would ..."
    pub dry_run: bool,
}

/// Engine for synchronizing the repository with its manifest sources
pub struct SyncEngine {
    root: NormalizedPath,
    discovery: Box<dyn Discovery>,
    resolver: Box<dyn SourceResolver>,
}

/// Pre-image entry: a resource and the source that owned it before the run.
struct Owned {
    reference: ResourceRef,
    owner: SourceKey,
}

/// Sources that imported each resource during this run.
///
/// Checked before live metadata, which a dry run never writes.
type Claims = HashMap<ResourceRef, SourceKey>;

/// Whether a source other than `owner` took `reference` over, either earlier
/// in this run or according to the stored metadata.
fn claimed_elsewhere(
    reference: &ResourceRef,
    owner: &SourceKey,
    claims: &Claims,
    metadata: &MetadataStore,
) -> Result<bool> {
    if let Some(claimant) = claims.get(reference) {
        return Ok(claimant != owner);
    }
    Ok(metadata
        .load(reference.kind, &reference.name)?
        .is_some_and(|live| !owner.owns(&live)))
}

impl SyncEngine {
    /// Create an engine using layout discovery and the clone cache.
    pub fn new(root: NormalizedPath) -> Self {
        let resolver = CacheResolver::new(&root);
        Self {
            root,
            discovery: Box::new(LayoutDiscovery),
            resolver: Box::new(resolver),
        }
    }

    pub fn with_discovery(mut self, discovery: impl Discovery + 'static) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    pub fn with_resolver(mut self, resolver: impl SourceResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Sync every source in the manifest.
    ///
    /// Fails only if the manifest cannot be loaded or has no sources. A
    /// report where every source failed is still returned;
    /// [`SyncReport::ensure_success`] turns it into an error.
    pub fn sync(&self, options: SyncOptions) -> Result<SyncReport> {
        let manifest = Manifest::load(&self.root)?;
        if manifest.sources.is_empty() {
            return Err(Error::invalid("manifest", "no sources configured"));
        }

        let metadata = MetadataStore::new(self.root.clone());
        let pre_image = metadata.scan()?;

        let mut report = SyncReport::new(options.dry_run);
        let mut state = SourceState::load(&self.root).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable source state");
            SourceState::default()
        });
        let mut pending: Vec<Owned> = Vec::new();
        let mut claims = Claims::new();

        for source in &manifest.sources {
            let key = source.key();
            let span = tracing::info_span!("sync_source", source = %source.name);
            let _enter = span.enter();

            let import_options = ImportOptions {
                force: !options.skip_existing,
                skip_existing: options.skip_existing,
                dry_run: options.dry_run,
                ..Default::default()
            };
            let (import, discovered) = match self.import_source(source, import_options) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "source failed");
                    report
                        .sources
                        .push(SourceOutcome::failed(&source.name, &source.id, &e));
                    continue;
                }
            };

            for entry in import.added.iter().chain(&import.updated) {
                claims.insert(ResourceRef::new(entry.kind, entry.name.clone()), key.clone());
            }

            let current = discovered.refs();
            for reference in owned_by(&pre_image, &key) {
                if current.contains(&reference) {
                    continue;
                }
                match claimed_elsewhere(&reference, &key, &claims, &metadata) {
                    Ok(true) => {
                        tracing::debug!(resource = %reference, "now owned by another source, keeping");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(resource = %reference, error = %e, "unreadable metadata, keeping");
                        continue;
                    }
                    Ok(false) => {}
                }
                pending.push(Owned {
                    reference,
                    owner: key.clone(),
                });
            }

            if !options.dry_run {
                state.record_sync(&source.name, &source.id, Utc::now());
            }
            report
                .sources
                .push(SourceOutcome::synced(&source.name, &source.id, import));
        }

        if !options.dry_run {
            if let Err(e) = state.save(&self.root) {
                tracing::warn!(error = %e, "could not save source state");
            }
        }

        self.apply_removals(pending, &claims, &metadata, &mut report);

        tracing::info!(summary = %report.summary(), "sync finished");
        Ok(report)
    }

    /// Resolve, discover and import a single source.
    ///
    /// Used by sync and by adding a source; nothing is removed. The import
    /// mode and provenance always come from `source`.
    pub fn import_source(
        &self,
        source: &ManifestSource,
        options: ImportOptions,
    ) -> Result<(ImportReport, Discovered)> {
        let resolved = self.resolver.resolve(source)?;
        let discovered = self
            .discovery
            .discover(&resolved)
            .map_err(|e| Error::unavailable(&source.name, e))?;
        if discovered.is_empty() {
            tracing::warn!(source = %source.name, path = %resolved.display(), "source provides no resources");
        }

        let import_options = ImportOptions {
            mode: source.mode(),
            origin: Some(provenance(source)?),
            ..options
        };
        let report = BulkImporter::new(self.root.clone()).import(&discovered, import_options);

        Ok((report, discovered))
    }

    fn apply_removals(
        &self,
        pending: Vec<Owned>,
        claims: &Claims,
        metadata: &MetadataStore,
        report: &mut SyncReport,
    ) {
        let store = ResourceStore::new(self.root.clone());

        for Owned { reference, owner } in pending {
            // A later source may have taken the resource over during this run
            if let Ok(true) = claimed_elsewhere(&reference, &owner, claims, metadata) {
                tracing::debug!(resource = %reference, "claimed by another source, keeping");
                continue;
            }

            report.action(format!("Remove {reference} (no longer in {})", owner.name));
            if !report.dry_run {
                let removed = store
                    .remove(reference.kind, &reference.name)
                    .and_then(|_| metadata.delete(reference.kind, &reference.name));
                if let Err(e) = removed {
                    tracing::warn!(resource = %reference, error = %e, "removal failed");
                    report.errors.push(format!("Failed to remove {reference}: {e}"));
                    continue;
                }
                tracing::info!(resource = %reference, source = %owner.name, "removed orphaned resource");
            }

            report.removed.push(Removal {
                kind: reference.kind,
                name: reference.name,
                source: owner.name,
            });
        }
    }
}

/// Resources in the pre-image that belong to `key`.
fn owned_by(pre_image: &MetadataScan, key: &SourceKey) -> BTreeSet<ResourceRef> {
    pre_image
        .records
        .iter()
        .filter(|stored| key.owns(&stored.record))
        .map(|stored| stored.record.resource_ref())
        .collect()
}

/// Metadata provenance for resources imported from `source`.
pub(crate) fn provenance(source: &ManifestSource) -> Result<Provenance> {
    let source_url = match (&source.url, &source.path) {
        (Some(url), _) => url.clone(),
        (None, Some(path)) => format!("file://{}", NormalizedPath::absolute(path)?),
        (None, None) => String::new(),
    };
    Ok(Provenance {
        source_type: source.source_type(),
        source_url,
        source_name: Some(source.name.clone()),
        source_id: Some(source.id.clone()),
        reference: source.reference.clone(),
    })
}
