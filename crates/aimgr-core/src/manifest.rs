//! Source manifest (`ai.repo.yaml`)
//!
//! The manifest is a human-editable, ordered list of sources. Each source has
//! exactly one of `path` (symlinked) or `url` (cloned and copied), a unique
//! name, and a stable ID derived from its canonical location.

use std::collections::HashSet;
use std::sync::LazyLock;

use aimgr_fs::{ConfigStore, NormalizedPath, RepoPath, digest};
use aimgr_git::normalize_url;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::metadata::{ResourceMetadata, SourceType};
use crate::resource::validate_name;
use crate::{Error, Result};

pub const MANIFEST_VERSION: u32 = 1;

const SOURCE_ID_PREFIX: &str = "src-";
const SOURCE_ID_HEX_LEN: usize = 12;

static NON_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").unwrap());
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// How content from a source is placed in the resource store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Link to the content in place (local path sources)
    Symlink,
    /// Copy the content (remote sources, one-off imports)
    Copy,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symlink => "symlink",
            Self::Copy => "copy",
        }
    }
}

/// One entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSource {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subpath: Option<String>,
}

impl ManifestSource {
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            id: String::new(),
            path: Some(path.into()),
            url: None,
            reference: None,
            subpath: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            path: None,
            url: Some(url.into()),
            ..Self::from_path("")
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_ref(mut self, reference: Option<String>) -> Self {
        self.reference = reference.filter(|r| !r.is_empty());
        self
    }

    pub fn with_subpath(mut self, subpath: Option<String>) -> Self {
        self.subpath = subpath.filter(|s| !s.is_empty());
        self
    }

    pub fn mode(&self) -> ImportMode {
        if self.url.is_some() {
            ImportMode::Copy
        } else {
            ImportMode::Symlink
        }
    }

    pub fn source_type(&self) -> SourceType {
        if self.url.is_some() {
            SourceType::Github
        } else {
            SourceType::Local
        }
    }

    /// The configured location (`path` or `url`), as written.
    pub fn location(&self) -> &str {
        self.url
            .as_deref()
            .or(self.path.as_deref())
            .unwrap_or_default()
    }

    /// Typed identity of this source.
    pub fn key(&self) -> SourceKey {
        SourceKey {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    fn matches(&self, identifier: &str) -> bool {
        self.name == identifier
            || self.path.as_deref() == Some(identifier)
            || self.url.as_deref() == Some(identifier)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid("source", "name cannot be empty"));
        }
        validate_name(None, &self.name)
            .map_err(|e| Error::invalid("source name", e.to_string()))?;

        let has_path = self.path.as_deref().is_some_and(|p| !p.is_empty());
        let has_url = self.url.as_deref().is_some_and(|u| !u.is_empty());
        match (has_path, has_url) {
            (true, true) => Err(Error::invalid(
                "source",
                format!("'{}' cannot have both path and url", self.name),
            )),
            (false, false) => Err(Error::invalid(
                "source",
                format!("'{}' must have either path or url", self.name),
            )),
            _ => Ok(()),
        }
    }
}

/// Stable, typed identity of a manifest source.
///
/// Resolved once when the manifest is loaded; ownership checks against
/// metadata go through [`owns`](Self::owns) and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub id: String,
    pub name: String,
}

impl SourceKey {
    /// Whether `record` was imported from this source.
    ///
    /// Records carrying a `source_id` match on ID only, which survives
    /// renames. Older records without one fall back to the source name.
    pub fn owns(&self, record: &ResourceMetadata) -> bool {
        match record.source_id.as_deref() {
            Some(id) if !id.is_empty() => id == self.id,
            _ => record.source_name.as_deref() == Some(self.name.as_str()),
        }
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Stable ID for a source: `src-` plus 12 hex chars of the SHA-256 of its
/// canonical location.
///
/// URLs are normalized, paths are made absolute. A ref or subpath is appended
/// when present, so the same repository tracked at two refs gets two IDs.
pub fn generate_source_id(source: &ManifestSource) -> Result<String> {
    let mut canonical = if let Some(url) = source.url.as_deref().filter(|u| !u.is_empty()) {
        normalize_url(url)
    } else if let Some(path) = source.path.as_deref().filter(|p| !p.is_empty()) {
        NormalizedPath::absolute(path)?.as_str().to_string()
    } else {
        return Err(Error::invalid("source", "must have either path or url"));
    };

    if let Some(reference) = &source.reference {
        canonical.push('@');
        canonical.push_str(reference);
    }
    if let Some(subpath) = &source.subpath {
        canonical.push('#');
        canonical.push_str(subpath.trim_matches('/'));
    }

    Ok(format!(
        "{}{}",
        SOURCE_ID_PREFIX,
        digest::short_digest(&canonical, SOURCE_ID_HEX_LEN)
    ))
}

/// Derive a valid source name from the last path or URL component.
pub fn generate_source_name(source: &ManifestSource) -> String {
    let location = source.location().trim_end_matches(['/', '\\']);
    let location = location.strip_suffix(".git").unwrap_or(location);
    let base = location
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let name = NON_NAME_CHARS.replace_all(&base, "-");
    let name = HYPHEN_RUNS.replace_all(&name, "-");
    let mut name = name.trim_matches('-').to_string();
    if name.len() > 64 {
        name.truncate(64);
        name = name.trim_end_matches('-').to_string();
    }

    if name.is_empty() {
        "source".to_string()
    } else {
        name
    }
}

/// The parsed `ai.repo.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    #[serde(default)]
    pub sources: Vec<ManifestSource>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            sources: Vec::new(),
        }
    }
}

impl Manifest {
    pub fn path(repo_root: &NormalizedPath) -> NormalizedPath {
        repo_root.join(RepoPath::Manifest.as_str())
    }

    /// Load the manifest, or an empty one if the file does not exist.
    ///
    /// Sources without an ID get one generated; the manifest is then saved
    /// back, and a failed save is only logged.
    pub fn load(repo_root: &NormalizedPath) -> Result<Self> {
        let path = Self::path(repo_root);
        let loaded: Option<Manifest> = ConfigStore::new().load_optional(&path).map_err(|e| match e {
            aimgr_fs::Error::ConfigParse { message, .. } => {
                Error::invalid("manifest", format!("{path}: {message}"))
            }
            other => other.into(),
        })?;
        let Some(mut manifest) = loaded else {
            return Ok(Self::default());
        };

        if manifest.assign_missing_ids()? {
            if let Err(e) = manifest.save(repo_root) {
                tracing::warn!(path = %path, error = %e, "could not persist generated source IDs");
            }
        }

        manifest.validate()?;
        Ok(manifest)
    }

    pub fn save(&self, repo_root: &NormalizedPath) -> Result<()> {
        self.validate()?;
        ConfigStore::new().save(&Self::path(repo_root), self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != MANIFEST_VERSION {
            return Err(Error::invalid(
                "manifest",
                format!("unsupported version {} (expected {MANIFEST_VERSION})", self.version),
            ));
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(Error::invalid(
                    "manifest",
                    format!("duplicate source name '{}'", source.name),
                ));
            }
            if !source.id.is_empty() && !ids.insert(source.id.as_str()) {
                return Err(Error::invalid(
                    "manifest",
                    format!("duplicate source id '{}'", source.id),
                ));
            }
        }

        Ok(())
    }

    fn assign_missing_ids(&mut self) -> Result<bool> {
        let mut assigned = false;
        for source in self.sources.iter_mut().filter(|s| s.id.is_empty()) {
            source.id = generate_source_id(source)?;
            assigned = true;
        }
        Ok(assigned)
    }

    /// Add a source, generating its name and ID when absent.
    ///
    /// Rejects a source whose location is already registered under another
    /// name, and any duplicate name.
    pub fn add_source(&mut self, mut source: ManifestSource) -> Result<&ManifestSource> {
        if source.name.is_empty() {
            source.name = generate_source_name(&source);
        }
        if source.id.is_empty() {
            source.id = generate_source_id(&source)?;
        }
        source.validate()?;

        if let Some(existing) = self
            .sources
            .iter()
            .find(|s| s.id == source.id && s.name != source.name)
        {
            return Err(Error::invalid(
                "source",
                format!(
                    "same location already registered as '{}' (ID: {})",
                    existing.name, existing.id
                ),
            ));
        }
        if self.sources.iter().any(|s| s.name == source.name) {
            return Err(Error::invalid(
                "source",
                format!("a source named '{}' already exists", source.name),
            ));
        }

        self.sources.push(source);
        let added = self.sources.len() - 1;
        Ok(&self.sources[added])
    }

    /// Find a source by ID, then by name, path, or URL.
    pub fn get_source(&self, identifier: &str) -> Option<&ManifestSource> {
        self.position(identifier).map(|i| &self.sources[i])
    }

    pub fn has_source(&self, identifier: &str) -> bool {
        self.position(identifier).is_some()
    }

    /// Remove a source by ID, then by name, path, or URL.
    pub fn remove_source(&mut self, identifier: &str) -> Result<ManifestSource> {
        let index = self
            .position(identifier)
            .ok_or_else(|| Error::NotFound(format!("source '{identifier}'")))?;
        Ok(self.sources.remove(index))
    }

    fn position(&self, identifier: &str) -> Option<usize> {
        if identifier.is_empty() {
            return None;
        }
        self.sources
            .iter()
            .position(|s| !s.id.is_empty() && s.id == identifier)
            .or_else(|| self.sources.iter().position(|s| s.matches(identifier)))
    }
}
