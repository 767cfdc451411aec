//! Discovery: classify a source tree into import candidates
//!
//! The engines only depend on the [`Discovery`] trait. [`LayoutDiscovery`]
//! classifies purely by directory convention and never reads frontmatter.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use aimgr_fs::NormalizedPath;

use crate::package::Package;
use crate::resource::{ResourceKind, ResourceRef, validate_name};
use crate::Result;

/// Maximum nesting below `commands/` that is still searched.
const MAX_COMMAND_DEPTH: usize = 5;

/// Markdown files under `commands/` that are never commands.
const EXCLUDED_COMMAND_FILES: &[&str] = &["README.md", "SKILL.md"];

/// Locations searched below a source root, in priority order.
const SEARCH_ROOTS: &[&str] = &["", ".claude", ".opencode"];

const PACKAGE_SUFFIX: &str = ".package.json";

/// A resource found in a source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: ResourceKind,
    pub name: String,
    /// File (commands, agents) or directory (skills) holding the content
    pub content_path: PathBuf,
}

impl Candidate {
    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(self.kind, self.name.clone())
    }
}

/// A package descriptor found in a source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCandidate {
    pub package: Package,
    pub path: PathBuf,
}

/// A resource file that is present in the source but could not be read.
///
/// It still counts as provided by the source, so a sync never removes the
/// stored copy because of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEntry {
    pub kind: ResourceKind,
    pub name: String,
    pub path: PathBuf,
    pub error: String,
}

/// Everything a discovery pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    pub candidates: Vec<Candidate>,
    pub packages: Vec<PackageCandidate>,
    pub invalid: Vec<InvalidEntry>,
}

impl Discovered {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.packages.is_empty() && self.invalid.is_empty()
    }

    /// `type/name` of everything the source provides, readable or not.
    pub fn refs(&self) -> HashSet<ResourceRef> {
        self.candidates
            .iter()
            .map(Candidate::resource_ref)
            .chain(
                self.packages
                    .iter()
                    .map(|p| ResourceRef::new(ResourceKind::Package, p.package.name.clone())),
            )
            .chain(
                self.invalid
                    .iter()
                    .map(|i| ResourceRef::new(i.kind, i.name.clone())),
            )
            .collect()
    }
}

/// Classifies a directory tree into resources.
pub trait Discovery {
    fn discover(&self, root: &Path) -> Result<Discovered>;
}

/// Convention-based discovery over `commands/`, `skills/`, `agents/` and
/// `packages/`, also looking inside `.claude/` and `.opencode/`.
///
/// The first location to yield a `(type, name)` wins. A root that itself
/// contains `SKILL.md` is a single skill named after the directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutDiscovery;

impl LayoutDiscovery {
    pub fn new() -> Self {
        Self
    }
}

impl Discovery for LayoutDiscovery {
    fn discover(&self, root: &Path) -> Result<Discovered> {
        let mut found = Collector::default();

        if root.join("SKILL.md").is_file() {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            found.push(ResourceKind::Skill, name, root.to_path_buf());
            return Ok(found.finish());
        }

        for location in SEARCH_ROOTS {
            let base = if location.is_empty() {
                root.to_path_buf()
            } else {
                root.join(location)
            };
            if !base.is_dir() {
                continue;
            }

            scan_commands(&base.join("commands"), &base.join("commands"), 0, &mut found)?;
            scan_skills(&base.join("skills"), &mut found)?;
            scan_agents(&base.join("agents"), &mut found)?;
            scan_packages(&base.join("packages"), &mut found)?;
        }

        let discovered = found.finish();
        tracing::debug!(
            root = %root.display(),
            candidates = discovered.candidates.len(),
            packages = discovered.packages.len(),
            invalid = discovered.invalid.len(),
            "discovered resources"
        );
        Ok(discovered)
    }
}

#[derive(Default)]
struct Collector {
    seen: HashSet<ResourceRef>,
    out: Discovered,
}

impl Collector {
    fn accept(&mut self, kind: ResourceKind, name: &str, path: &Path) -> bool {
        if let Err(e) = validate_name(Some(kind), name) {
            tracing::warn!(path = %path.display(), error = %e, "skipping resource with invalid name");
            return false;
        }
        self.seen.insert(ResourceRef::new(kind, name))
    }

    fn push(&mut self, kind: ResourceKind, name: String, content_path: PathBuf) {
        if self.accept(kind, &name, &content_path) {
            self.out.candidates.push(Candidate {
                kind,
                name,
                content_path,
            });
        }
    }

    fn push_package(&mut self, package: Package, path: PathBuf) {
        if self.accept(ResourceKind::Package, &package.name, &path) {
            self.out.packages.push(PackageCandidate { package, path });
        }
    }

    fn push_invalid(&mut self, kind: ResourceKind, name: String, path: PathBuf, error: String) {
        if self.accept(kind, &name, &path) {
            self.out.invalid.push(InvalidEntry {
                kind,
                name,
                path,
                error,
            });
        }
    }

    fn finish(self) -> Discovered {
        self.out
    }
}

/// Sorted entries of `dir`; a missing directory is empty.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<Vec<_>>>()
        })
        .map_err(|e| aimgr_fs::Error::io(dir, e))?;
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn scan_commands(base: &Path, dir: &Path, depth: usize, found: &mut Collector) -> Result<()> {
    if depth > MAX_COMMAND_DEPTH {
        return Ok(());
    }
    for path in sorted_entries(dir)? {
        let file = file_name(&path);
        if path.is_dir() {
            if !file.starts_with('.') {
                scan_commands(base, &path, depth + 1, found)?;
            }
            continue;
        }
        if !file.ends_with(".md") || EXCLUDED_COMMAND_FILES.contains(&file.as_str()) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(base) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if let Some(name) = relative.strip_suffix(".md") {
            found.push(ResourceKind::Command, name.to_string(), path.clone());
        }
    }
    Ok(())
}

fn scan_skills(dir: &Path, found: &mut Collector) -> Result<()> {
    for path in sorted_entries(dir)? {
        if path.is_dir() && path.join("SKILL.md").is_file() {
            found.push(ResourceKind::Skill, file_name(&path), path);
        }
    }
    Ok(())
}

fn scan_agents(dir: &Path, found: &mut Collector) -> Result<()> {
    for path in sorted_entries(dir)? {
        let file = file_name(&path);
        if !path.is_file() || EXCLUDED_COMMAND_FILES.contains(&file.as_str()) {
            continue;
        }
        if let Some(name) = file.strip_suffix(".md") {
            found.push(ResourceKind::Agent, name.to_string(), path.clone());
        }
    }
    Ok(())
}

fn scan_packages(dir: &Path, found: &mut Collector) -> Result<()> {
    for path in sorted_entries(dir)? {
        let file = file_name(&path);
        let Some(stem) = file.strip_suffix(PACKAGE_SUFFIX) else {
            continue;
        };
        if !path.is_file() {
            continue;
        }
        match Package::load(&NormalizedPath::new(&path)) {
            Ok(package) => found.push_package(package, path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid package");
                found.push_invalid(ResourceKind::Package, stem.to_string(), path, e.to_string());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimgr_test_utils::SourceTree;
    use pretty_assertions::assert_eq;

    fn refs(discovered: &Discovered) -> Vec<String> {
        let mut refs: Vec<String> = discovered.refs().iter().map(ToString::to_string).collect();
        refs.sort();
        refs
    }

    #[test]
    fn classifies_by_layout() {
        let source = SourceTree::new()
            .command("deploy")
            .command("api/status")
            .skill("pdf")
            .agent("reviewer")
            .package("bundle", &["command/deploy"]);
        source.write("commands/README.md", "# docs");

        let discovered = LayoutDiscovery.discover(source.path()).unwrap();

        assert_eq!(
            refs(&discovered),
            vec![
                "agent/reviewer",
                "command/api/status",
                "command/deploy",
                "package/bundle",
                "skill/pdf"
            ]
        );
        assert_eq!(discovered.packages[0].package.resources, vec!["command/deploy"]);
    }

    #[test]
    fn root_skill_is_named_after_directory() {
        let source = SourceTree::new().skill("pdf-tool");
        let skill_root = source.path().join("skills/pdf-tool");

        let discovered = LayoutDiscovery.discover(&skill_root).unwrap();

        assert_eq!(discovered.candidates.len(), 1);
        assert_eq!(discovered.candidates[0].name, "pdf-tool");
        assert_eq!(discovered.candidates[0].content_path, skill_root);
    }

    #[test]
    fn first_location_wins() {
        let source = SourceTree::new().command_with("deploy", "top");
        source.write(".claude/commands/deploy.md", "claude");
        source.write(".opencode/agents/helper.md", "opencode");

        let discovered = LayoutDiscovery.discover(source.path()).unwrap();

        let deploy = discovered
            .candidates
            .iter()
            .find(|c| c.name == "deploy")
            .unwrap();
        assert_eq!(deploy.content_path, source.path().join("commands/deploy.md"));
        assert!(discovered.candidates.iter().any(|c| c.name == "helper"));
    }

    #[test]
    fn invalid_names_are_skipped() {
        let source = SourceTree::new().command("Bad_Name").agent("ok");
        source.write("skills/no-skill-md/notes.md", "x");

        let discovered = LayoutDiscovery.discover(source.path()).unwrap();

        assert_eq!(refs(&discovered), vec!["agent/ok"]);
        assert!(discovered.invalid.is_empty());
    }

    #[test]
    fn unreadable_package_is_reported_as_invalid() {
        let source = SourceTree::new().agent("ok");
        source.write("packages/broken.package.json", "{");

        let discovered = LayoutDiscovery.discover(source.path()).unwrap();

        assert!(discovered.packages.is_empty());
        assert_eq!(discovered.invalid.len(), 1);
        assert_eq!(discovered.invalid[0].kind, ResourceKind::Package);
        assert_eq!(discovered.invalid[0].name, "broken");
        assert_eq!(refs(&discovered), vec!["agent/ok", "package/broken"]);
    }

    #[test]
    fn non_directory_resource_root_is_ignored() {
        let source = SourceTree::new().agent("ok");
        source.write("commands", "not a directory");

        let discovered = LayoutDiscovery.discover(source.path()).unwrap();

        assert_eq!(refs(&discovered), vec!["agent/ok"]);
    }

    #[test]
    fn empty_tree_discovers_nothing() {
        let source = SourceTree::new();
        assert!(LayoutDiscovery.discover(source.path()).unwrap().is_empty());
    }
}
