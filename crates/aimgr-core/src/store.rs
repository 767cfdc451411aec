//! Resource store: the on-disk content tree
//!
//! ```text
//! <root>/
//! ├── commands/<name>.md            (nested: commands/api/deploy.md)
//! ├── skills/<name>/SKILL.md
//! ├── agents/<name>.md
//! └── packages/<name>.package.json
//! ```
//!
//! Entries are either copies or symlinks to the source content; a dangling
//! symlink still counts as a present resource.

use std::fs;
use std::path::Path;

use aimgr_fs::{NormalizedPath, io};
use serde::Serialize;

use crate::manifest::ImportMode;
use crate::resource::{ResourceKind, ResourceRef};
use crate::Result;

const PACKAGE_SUFFIX: &str = ".package.json";

/// A resource found in the content tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StoredResource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    pub path: NormalizedPath,
}

impl StoredResource {
    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(self.kind, self.name.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: NormalizedPath,
}

impl ResourceStore {
    pub fn new(root: NormalizedPath) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn path_of(&self, kind: ResourceKind, name: &str) -> NormalizedPath {
        self.root.join(&kind.relative_path(name))
    }

    /// Whether anything occupies the resource's path (dangling links included).
    pub fn exists(&self, kind: ResourceKind, name: &str) -> bool {
        self.path_of(kind, name).is_present()
    }

    pub fn contains(&self, reference: &ResourceRef) -> bool {
        self.exists(reference.kind, &reference.name)
    }

    /// Create the per-kind directories.
    pub fn ensure_layout(&self) -> Result<()> {
        for kind in ResourceKind::ALL {
            io::ensure_dir(&self.root.join(kind.dir_name()))?;
        }
        Ok(())
    }

    /// Place `content` at the resource's path, replacing whatever is there.
    ///
    /// Symlink mode links to the absolute content path; copy mode copies the
    /// file or the whole directory.
    pub fn install(
        &self,
        kind: ResourceKind,
        name: &str,
        content: &Path,
        mode: ImportMode,
    ) -> Result<NormalizedPath> {
        let dest = self.path_of(kind, name);
        io::remove_entry(&dest)?;

        match mode {
            ImportMode::Symlink => {
                let target = NormalizedPath::absolute(content)?;
                io::symlink(&target.to_native(), &dest)?;
            }
            ImportMode::Copy if content.is_dir() => io::copy_dir(content, &dest)?,
            ImportMode::Copy => io::copy_file(content, &dest)?,
        }

        tracing::debug!(kind = %kind, name, dest = %dest, ?mode, "installed resource");
        Ok(dest)
    }

    /// Delete a resource's content, pruning emptied nested command dirs.
    ///
    /// Returns false when nothing was there.
    pub fn remove(&self, kind: ResourceKind, name: &str) -> Result<bool> {
        let path = self.path_of(kind, name);
        let removed = io::remove_entry(&path)?;
        if removed {
            if let Some(parent) = path.parent() {
                io::prune_empty_dirs(&parent, &self.root.join(kind.dir_name()));
            }
        }
        Ok(removed)
    }

    /// Every resource in the content tree, sorted by kind then name.
    pub fn list(&self) -> Result<Vec<StoredResource>> {
        let mut resources = Vec::new();
        for kind in ResourceKind::ALL {
            resources.extend(self.list_kind(kind)?);
        }
        resources.sort();
        Ok(resources)
    }

    pub fn list_kind(&self, kind: ResourceKind) -> Result<Vec<StoredResource>> {
        let dir = self.root.join(kind.dir_name());
        let mut found = Vec::new();
        if !dir.is_dir() {
            return Ok(found);
        }

        match kind {
            ResourceKind::Command => self.walk_commands(&dir, &dir, &mut found)?,
            ResourceKind::Skill => {
                for (name, path) in read_entries(&dir)? {
                    // Dangling links included; a stray file is not a skill
                    if path.is_dir() || path.is_symlink() {
                        found.push(self.entry(kind, name, path));
                    }
                }
            }
            ResourceKind::Agent => {
                for (name, path) in read_entries(&dir)? {
                    if let Some(stem) = name.strip_suffix(".md").filter(|_| !path.is_dir()) {
                        found.push(self.entry(kind, stem.to_string(), path));
                    }
                }
            }
            ResourceKind::Package => {
                for (name, path) in read_entries(&dir)? {
                    if let Some(stem) = name.strip_suffix(PACKAGE_SUFFIX) {
                        found.push(self.entry(kind, stem.to_string(), path));
                    }
                }
            }
        }

        found.sort();
        Ok(found)
    }

    fn walk_commands(
        &self,
        base: &NormalizedPath,
        dir: &NormalizedPath,
        found: &mut Vec<StoredResource>,
    ) -> Result<()> {
        for (name, path) in read_entries(dir)? {
            if path.is_dir() && !path.is_symlink() {
                self.walk_commands(base, &path, found)?;
                continue;
            }
            if !name.ends_with(".md") {
                continue;
            }
            let Some(relative) = path.relative_to(base) else {
                continue;
            };
            if let Some(command) = relative.strip_suffix(".md") {
                found.push(self.entry(ResourceKind::Command, command.to_string(), path.clone()));
            }
        }
        Ok(())
    }

    fn entry(&self, kind: ResourceKind, name: String, path: NormalizedPath) -> StoredResource {
        StoredResource { kind, name, path }
    }
}

/// `(file name, path)` pairs of a directory, sorted by name.
fn read_entries(dir: &NormalizedPath) -> Result<Vec<(String, NormalizedPath)>> {
    let native = dir.to_native();
    let entries = fs::read_dir(&native).map_err(|e| aimgr_fs::Error::io(&native, e))?;

    let mut out: Vec<(String, NormalizedPath)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = dir.join(&name);
            (name, path)
        })
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimgr_test_utils::SourceTree;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn names(resources: &[StoredResource]) -> Vec<String> {
        resources.iter().map(|r| r.resource_ref().to_string()).collect()
    }

    #[test]
    fn install_copy_and_list() {
        let temp = TempDir::new().unwrap();
        let source = SourceTree::new().command("api/deploy").skill("pdf").agent("reviewer");
        let store = ResourceStore::new(NormalizedPath::new(temp.path()));

        store
            .install(
                ResourceKind::Command,
                "api/deploy",
                &source.path().join("commands/api/deploy.md"),
                ImportMode::Copy,
            )
            .unwrap();
        store
            .install(ResourceKind::Skill, "pdf", &source.path().join("skills/pdf"), ImportMode::Copy)
            .unwrap();
        store
            .install(
                ResourceKind::Agent,
                "reviewer",
                &source.path().join("agents/reviewer.md"),
                ImportMode::Copy,
            )
            .unwrap();

        assert_eq!(
            names(&store.list().unwrap()),
            vec!["command/api/deploy", "skill/pdf", "agent/reviewer"]
        );
        assert!(temp.path().join("skills/pdf/SKILL.md").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_mode_links_absolute_content() {
        let temp = TempDir::new().unwrap();
        let source = SourceTree::new().skill("pdf");
        let store = ResourceStore::new(NormalizedPath::new(temp.path()));

        let dest = store
            .install(ResourceKind::Skill, "pdf", &source.path().join("skills/pdf"), ImportMode::Symlink)
            .unwrap();

        assert!(dest.is_symlink());
        let target = std::fs::read_link(dest.to_native()).unwrap();
        assert!(target.is_absolute());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_links_are_listed() {
        let temp = TempDir::new().unwrap();
        let source = SourceTree::new().agent("gone");
        let store = ResourceStore::new(NormalizedPath::new(temp.path()));
        store
            .install(
                ResourceKind::Agent,
                "gone",
                &source.path().join("agents/gone.md"),
                ImportMode::Symlink,
            )
            .unwrap();
        drop(source);

        assert!(store.exists(ResourceKind::Agent, "gone"));
        assert_eq!(names(&store.list().unwrap()), vec!["agent/gone"]);
    }

    #[test]
    fn remove_prunes_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let source = SourceTree::new().command("api/v1/deploy");
        let store = ResourceStore::new(NormalizedPath::new(temp.path()));
        store.ensure_layout().unwrap();
        store
            .install(
                ResourceKind::Command,
                "api/v1/deploy",
                &source.path().join("commands/api/v1/deploy.md"),
                ImportMode::Copy,
            )
            .unwrap();

        assert!(store.remove(ResourceKind::Command, "api/v1/deploy").unwrap());

        assert!(!temp.path().join("commands/api").exists());
        assert!(temp.path().join("commands").is_dir());
        assert!(!store.remove(ResourceKind::Command, "api/v1/deploy").unwrap());
    }

    #[test]
    fn install_replaces_existing_content() {
        let temp = TempDir::new().unwrap();
        let first = SourceTree::new().command_with("x", "first");
        let second = SourceTree::new().command_with("x", "second");
        let store = ResourceStore::new(NormalizedPath::new(temp.path()));

        for source in [&first, &second] {
            store
                .install(
                    ResourceKind::Command,
                    "x",
                    &source.path().join("commands/x.md"),
                    ImportMode::Copy,
                )
                .unwrap();
        }

        assert_eq!(
            std::fs::read_to_string(temp.path().join("commands/x.md")).unwrap(),
            "second"
        );
    }

    #[test]
    fn list_ignores_foreign_files() {
        let source = SourceTree::new();
        source.write("agents/notes.txt", "x");
        source.write("packages/readme.md", "x");
        source.write("skills/stray.md", "x");
        let store = ResourceStore::new(NormalizedPath::new(source.path()));

        assert!(store.list().unwrap().is_empty());
    }
}
