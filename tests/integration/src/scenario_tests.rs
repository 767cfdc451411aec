//! Cross-crate scenario tests
//!
//! Each test drives a repository through the `Repository` facade the way a
//! user would, with Git remotes created on the fly by `aimgr-test-utils`.

use std::fs;
use std::path::Path;

use aimgr_core::{
    AddSourceRequest, ImportOptions, Manifest, RemoveSourceOptions, Repository, ResourceKind,
    SyncOptions, VerifyOptions,
};
use aimgr_fs::NormalizedPath;
use aimgr_test_utils::git::{commit_files, tag_head};
use aimgr_test_utils::{SourceTree, TestRepo};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn open(test: &TestRepo) -> Repository {
    let repo = Repository::new(NormalizedPath::new(test.root()));
    repo.init().unwrap();
    repo
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn add(repo: &Repository, location: String, name: &str, reference: Option<&str>) {
    let report = repo
        .add_source(
            AddSourceRequest {
                location,
                name: Some(name.to_string()),
                reference: reference.map(str::to_string),
                subpath: None,
            },
            ImportOptions::default(),
        )
        .unwrap();
    assert!(report.import.failed.is_empty(), "{:?}", report.import.failed);
}

fn read(test: &TestRepo, relative: &str) -> String {
    fs::read_to_string(test.root().join(relative)).unwrap()
}

// =============================================================================
// Remote sources
// =============================================================================

#[test]
fn test_pinned_remote_ignores_later_commits() {
    let test = TestRepo::new();
    let repo = open(&test);
    let remote = TempDir::new().unwrap();
    commit_files(remote.path(), &[("skills/pdf/SKILL.md", "v1")], "v1");
    tag_head(remote.path(), "v1.0");
    commit_files(remote.path(), &[("skills/pdf/SKILL.md", "v2")], "v2");

    add(&repo, file_url(remote.path()), "pinned", Some("v1.0"));
    assert_eq!(read(&test, "skills/pdf/SKILL.md"), "v1");

    repo.sync(SyncOptions::default()).unwrap();
    assert_eq!(read(&test, "skills/pdf/SKILL.md"), "v1");

    let manifest = Manifest::load(repo.root()).unwrap();
    assert_eq!(manifest.sources[0].reference.as_deref(), Some("v1.0"));
}

#[test]
fn test_remote_changes_propagate_on_sync() {
    let test = TestRepo::new();
    let repo = open(&test);
    let remote = TempDir::new().unwrap();
    commit_files(
        remote.path(),
        &[("skills/alpha/SKILL.md", "alpha"), ("agents/helper.md", "helper")],
        "initial",
    );
    add(&repo, file_url(remote.path()), "upstream", None);

    fs::remove_file(remote.path().join("agents/helper.md")).unwrap();
    commit_files(remote.path(), &[("skills/beta/SKILL.md", "beta")], "add beta, drop helper");
    let report = repo.sync(SyncOptions::default()).unwrap();

    assert_eq!(report.totals().added.len(), 1);
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.removed[0].kind, ResourceKind::Agent);
    assert_eq!(read(&test, "skills/beta/SKILL.md"), "beta");
    test.assert_file_not_exists("agents/helper.md");
    assert!(repo.verify(VerifyOptions::default()).unwrap().is_clean());
}

// =============================================================================
// Ownership across sources
// =============================================================================

#[test]
fn test_remote_overrides_local_then_hands_back() {
    let test = TestRepo::new();
    let repo = open(&test);
    let local = SourceTree::new().skill("shared");
    let remote = TempDir::new().unwrap();
    commit_files(remote.path(), &[("skills/shared/SKILL.md", "from remote")], "initial");

    let mut manifest = Manifest::load(repo.root()).unwrap();
    manifest
        .add_source(
            aimgr_core::ManifestSource::from_path(local.path().to_string_lossy()).with_name("local"),
        )
        .unwrap();
    manifest
        .add_source(
            aimgr_core::ManifestSource::from_url(file_url(remote.path())).with_name("remote"),
        )
        .unwrap();
    manifest.save(repo.root()).unwrap();

    repo.sync(SyncOptions::default()).unwrap();
    let skill = test.root().join("skills/shared");
    assert!(!skill.is_symlink(), "the remote copy wins");
    assert_eq!(read(&test, "skills/shared/SKILL.md"), "from remote");

    // Removing the owner deletes the resource; the next sync restores it
    repo.remove_source("remote", RemoveSourceOptions::default()).unwrap();
    test.assert_file_not_exists("skills/shared");
    repo.sync(SyncOptions::default()).unwrap();
    assert!(skill.is_symlink());
}

// =============================================================================
// On-disk formats
// =============================================================================

#[test]
fn test_metadata_and_manifest_formats() {
    let test = TestRepo::new();
    let repo = open(&test);
    let local = SourceTree::new().command("api/deploy");
    add(&repo, local.path().to_string_lossy().into_owned(), "tools", None);

    let metadata: serde_json::Value =
        serde_json::from_str(&read(&test, ".metadata/commands/api-deploy-metadata.json")).unwrap();
    assert_eq!(metadata["name"], "api/deploy");
    assert_eq!(metadata["type"], "command");
    assert_eq!(metadata["source_type"], "local");
    assert_eq!(metadata["source_name"], "tools");
    assert!(metadata["source_url"].as_str().unwrap().starts_with("file://"));
    assert!(metadata["source_id"].as_str().unwrap().starts_with("src-"));
    assert_eq!(metadata["first_installed"], metadata["last_updated"]);

    let manifest = read(&test, "ai.repo.yaml");
    assert!(manifest.contains("version: 1"), "{manifest}");
    assert!(manifest.contains("name: tools"), "{manifest}");

    let state: serde_json::Value = serde_json::from_str(&read(&test, ".metadata/sources.json")).unwrap();
    assert!(state["sources"]["tools"]["added"].is_string());
}

// =============================================================================
// Recovery
// =============================================================================

#[test]
fn test_interrupted_import_is_repaired() {
    // Content landed but the metadata write never happened
    let test = TestRepo::new();
    let repo = open(&test);
    fs::create_dir_all(test.root().join("skills/half-done")).unwrap();
    fs::write(test.root().join("skills/half-done/SKILL.md"), "# half").unwrap();

    let report = repo.verify(VerifyOptions::default()).unwrap();
    assert!(report.has_warnings);
    assert!(!report.has_errors);

    let repaired = repo.repair(false).unwrap();
    assert_eq!(repaired.metadata_created.len(), 1);

    let metadata: serde_json::Value = serde_json::from_str(&read(
        &test,
        ".metadata/skills/half-done-metadata.json",
    ))
    .unwrap();
    assert_eq!(metadata["source_type"], "unknown");
    assert_eq!(metadata["source_url"], "");
    assert!(repo.verify(VerifyOptions::default()).unwrap().is_clean());
}

#[test]
fn test_every_mutation_is_committed() {
    let test = TestRepo::new();
    let repo = open(&test);
    let local = SourceTree::new().agent("reviewer");
    add(&repo, local.path().to_string_lossy().into_owned(), "tools", None);
    repo.remove_resources(&["agent/reviewer".to_string()], false)
        .unwrap();

    let git = git2::Repository::open(test.root()).unwrap();
    let mut walk = git.revwalk().unwrap();
    walk.push_head().unwrap();
    let messages: Vec<String> = walk
        .map(|oid| {
            git.find_commit(oid.unwrap())
                .unwrap()
                .summary()
                .unwrap_or_default()
                .to_string()
        })
        .collect();

    assert_eq!(messages.len(), 2, "{messages:?}");
    assert!(messages[0].starts_with("aimgr: remove 1 resource"));
    assert!(messages[1].starts_with("aimgr: add source tools"));
}
