//! Builders for source trees and repository roots.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory laid out like a resource source:
/// `commands/`, `skills/<name>/SKILL.md`, `agents/`, `packages/`.
///
/// # Example
///
/// ```rust,no_run
/// use aimgr_test_utils::SourceTree;
///
/// let source = SourceTree::new()
///     .command("deploy")
///     .skill("pdf-parser")
///     .package("bundle", &["command/deploy", "skill/pdf-parser"]);
/// assert!(source.path().join("commands/deploy.md").exists());
/// ```
pub struct SourceTree {
    temp_dir: TempDir,
}

impl Default for SourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceTree {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add `commands/<name>.md`; `name` may be nested (`api/deploy`).
    pub fn command(self, name: &str) -> Self {
        self.command_with(name, &format!("---\ndescription: {name} command\n---\n# {name}\n"))
    }

    pub fn command_with(self, name: &str, content: &str) -> Self {
        self.write(&format!("commands/{name}.md"), content);
        self
    }

    /// Add `skills/<name>/SKILL.md`.
    pub fn skill(self, name: &str) -> Self {
        self.write(
            &format!("skills/{name}/SKILL.md"),
            &format!("---\nname: {name}\ndescription: {name} skill\n---\n# {name}\n"),
        );
        self
    }

    /// Add `agents/<name>.md`.
    pub fn agent(self, name: &str) -> Self {
        self.write(
            &format!("agents/{name}.md"),
            &format!("---\ndescription: {name} agent\n---\n# {name}\n"),
        );
        self
    }

    /// Add `packages/<name>.package.json` referencing `resources`.
    pub fn package(self, name: &str, resources: &[&str]) -> Self {
        let refs = resources
            .iter()
            .map(|r| format!("\"{r}\""))
            .collect::<Vec<_>>()
            .join(", ");
        self.write(
            &format!("packages/{name}.package.json"),
            &format!(
                "{{\"name\": \"{name}\", \"description\": \"{name} package\", \"resources\": [{refs}]}}"
            ),
        );
        self
    }

    /// Write an arbitrary file relative to the tree root.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
    }

    /// Delete a file or directory relative to the tree root.
    pub fn remove(&self, relative: &str) {
        let path = self.path().join(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path).unwrap();
        } else {
            fs::remove_file(&path).unwrap();
        }
    }
}

/// An empty temporary directory used as a repository root.
pub struct TestRepo {
    temp_dir: TempDir,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the repository (a `repo/` directory inside the temp dir, not
    /// yet created).
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("repo")
    }

    /// Scratch space next to the repository root.
    pub fn scratch(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Assert that `path` (relative to the repo root) exists, allowing
    /// dangling symlinks.
    ///
    /// # Panics
    /// Panics with a descriptive message if nothing is at `path`.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            fs::symlink_metadata(&full_path).is_ok(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// # Panics
    /// Panics with a descriptive message if something is at `path`.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            fs::symlink_metadata(&full_path).is_err(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` (relative to root) contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let full_path = self.root().join(path);
        let file_content = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            full_path.display(),
            content,
            file_content
        );
    }
}

/// Capture every entry under `root` as relative path → bytes.
///
/// Symlinks are recorded by target (prefixed `->`) rather than followed, and
/// directories by a trailing `/`, so two snapshots compare equal only if the
/// trees are byte-identical.
pub fn snapshot_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut snapshot = BTreeMap::new();
    if root.exists() {
        walk(root, root, &mut snapshot);
    }
    snapshot
}

fn walk(root: &Path, dir: &Path, snapshot: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let relative = path
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        let metadata = fs::symlink_metadata(&path).unwrap();

        if metadata.file_type().is_symlink() {
            let target = fs::read_link(&path).unwrap();
            snapshot.insert(
                relative,
                format!("->{}", target.display()).into_bytes(),
            );
        } else if metadata.is_dir() {
            snapshot.insert(format!("{relative}/"), Vec::new());
            walk(root, &path, snapshot);
        } else {
            snapshot.insert(relative, fs::read(&path).unwrap());
        }
    }
}
