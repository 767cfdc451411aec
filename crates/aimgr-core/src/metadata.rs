//! Metadata sidecar: one JSON provenance record per tracked resource
//!
//! Records live at `.metadata/<type>s/<slug>-metadata.json`, where the slug is
//! the resource name with `/` replaced by `-`. The metadata directory is the
//! authoritative inventory of the repository: the content tree is treated as
//! a cache of what these records say should exist.

use std::fs;
use std::path::PathBuf;

use aimgr_fs::{ConfigStore, NormalizedPath, RepoPath, io};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::resource::{ResourceKind, ResourceRef};

const METADATA_SUFFIX: &str = "-metadata.json";

/// Where a resource came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A local directory registered as a manifest source (symlinked)
    Local,
    /// A remote Git repository (copied)
    Github,
    /// A path imported without a manifest source
    File,
    /// Created inside the repository, e.g. a package built from stored resources
    Manual,
    /// Metadata recreated by repair; provenance lost
    Unknown,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Github => "github",
            Self::File => "file",
            Self::Manual => "manual",
            Self::Unknown => "unknown",
        }
    }

    /// Whether `source_url` names a path on this machine.
    pub fn is_filesystem(&self) -> bool {
        matches!(self, Self::Local | Self::File)
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance attached to every record written by an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_type: SourceType,
    pub source_url: String,
    pub source_name: Option<String>,
    pub source_id: Option<String>,
    pub reference: Option<String>,
}

impl Provenance {
    /// Provenance for a path imported without a registered source.
    pub fn file(path: &NormalizedPath) -> Self {
        Self {
            source_type: SourceType::File,
            source_url: format!("file://{}", path),
            source_name: None,
            source_id: None,
            reference: None,
        }
    }

    /// Provenance for resources created inside the repository.
    pub fn manual() -> Self {
        Self {
            source_type: SourceType::Manual,
            source_url: String::new(),
            source_name: None,
            source_id: None,
            reference: None,
        }
    }
}

/// A resource's provenance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub source_type: SourceType,
    #[serde(default)]
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub first_installed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ResourceMetadata {
    pub fn new(
        kind: ResourceKind,
        name: impl Into<String>,
        provenance: &Provenance,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            source_type: provenance.source_type,
            source_url: provenance.source_url.clone(),
            source_name: provenance.source_name.clone(),
            source_id: provenance.source_id.clone(),
            reference: provenance.reference.clone(),
            first_installed: now,
            last_updated: now,
        }
    }

    /// Record that the resource was overwritten from `provenance`.
    ///
    /// `first_installed` is kept; everything else follows the new source.
    pub fn refresh(&mut self, provenance: &Provenance, now: DateTime<Utc>) {
        let first_installed = self.first_installed;
        *self = Self::new(self.kind, std::mem::take(&mut self.name), provenance, now);
        self.first_installed = first_installed;
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(self.kind, self.name.clone())
    }

    /// The on-disk source location for `local`/`file` records.
    pub fn local_source_path(&self) -> Option<PathBuf> {
        if !self.source_type.is_filesystem() || self.source_url.is_empty() {
            return None;
        }
        let path = self
            .source_url
            .strip_prefix("file://")
            .unwrap_or(&self.source_url);
        Some(PathBuf::from(path))
    }
}

/// A record found while scanning the metadata directory.
#[derive(Debug, Clone)]
pub struct StoredMetadata {
    /// Kind implied by the directory the record was found in
    pub location: ResourceKind,
    pub path: NormalizedPath,
    pub record: ResourceMetadata,
}

/// Result of reading every record in the metadata directory.
#[derive(Debug, Clone, Default)]
pub struct MetadataScan {
    pub records: Vec<StoredMetadata>,
    /// Files that could not be parsed
    pub unreadable: Vec<NormalizedPath>,
}

/// Reads and writes metadata records under a repository root.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: NormalizedPath,
    config: ConfigStore,
}

impl MetadataStore {
    pub fn new(repo_root: NormalizedPath) -> Self {
        Self {
            root: repo_root,
            config: ConfigStore::new(),
        }
    }

    pub fn dir(&self) -> NormalizedPath {
        self.root.join(RepoPath::MetadataDir.as_str())
    }

    pub fn kind_dir(&self, kind: ResourceKind) -> NormalizedPath {
        self.dir().join(kind.dir_name())
    }

    pub fn path_for(&self, kind: ResourceKind, name: &str) -> NormalizedPath {
        self.kind_dir(kind)
            .join(&format!("{}{}", name.replace('/', "-"), METADATA_SUFFIX))
    }

    /// Load the record for `(kind, name)`.
    ///
    /// A file whose recorded name differs (two names sharing a slug) is
    /// treated as absent.
    pub fn load(&self, kind: ResourceKind, name: &str) -> Result<Option<ResourceMetadata>> {
        let record: Option<ResourceMetadata> =
            self.config.load_optional(&self.path_for(kind, name))?;
        Ok(record.filter(|r| r.name == name))
    }

    /// Name of a different resource already recorded under this slug.
    pub fn slug_owner(&self, kind: ResourceKind, name: &str) -> Result<Option<String>> {
        let record: Option<ResourceMetadata> =
            self.config.load_optional(&self.path_for(kind, name))?;
        Ok(record.map(|r| r.name).filter(|recorded| recorded != name))
    }

    pub fn save(&self, record: &ResourceMetadata) -> Result<()> {
        let path = self.path_for(record.kind, &record.name);
        self.config.save(&path, record)?;
        tracing::trace!(path = %path, "wrote metadata");
        Ok(())
    }

    /// Delete the record for `(kind, name)`; returns false when none existed.
    pub fn delete(&self, kind: ResourceKind, name: &str) -> Result<bool> {
        Ok(io::remove_entry(&self.path_for(kind, name))?)
    }

    /// Delete a record file found by [`scan`](Self::scan).
    pub fn delete_path(&self, path: &NormalizedPath) -> Result<bool> {
        Ok(io::remove_entry(path)?)
    }

    /// Read every record of every kind directly from disk.
    pub fn scan(&self) -> Result<MetadataScan> {
        let mut scan = MetadataScan::default();

        for kind in ResourceKind::ALL {
            let dir = self.kind_dir(kind);
            let native = dir.to_native();
            let entries = match fs::read_dir(&native) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(aimgr_fs::Error::io(&native, e).into()),
            };

            let mut files: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_file())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(METADATA_SUFFIX))
                .collect();
            files.sort();

            for file in files {
                let path = dir.join(&file);
                match self.config.load::<ResourceMetadata>(&path) {
                    Ok(record) => scan.records.push(StoredMetadata {
                        location: kind,
                        path,
                        record,
                    }),
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "skipping unreadable metadata");
                        scan.unreadable.push(path);
                    }
                }
            }
        }

        Ok(scan)
    }
}
