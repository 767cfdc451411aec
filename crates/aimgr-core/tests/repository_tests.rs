//! End-to-end tests for the Repository facade

use aimgr_core::{
    AddSourceRequest, ImportOptions, Manifest, Pattern, RemoveSourceOptions, Repository,
    SyncOptions, VerifyOptions,
};
use aimgr_fs::NormalizedPath;
use aimgr_test_utils::{SourceTree, TestRepo};
use pretty_assertions::assert_eq;
use std::fs;

fn open(test: &TestRepo) -> Repository {
    let repo = Repository::new(NormalizedPath::new(test.root()));
    repo.init().unwrap();
    repo
}

fn add_local(repo: &Repository, tree: &SourceTree, name: &str) {
    let report = repo
        .add_source(
            AddSourceRequest {
                location: tree.path().to_string_lossy().into_owned(),
                name: Some(name.to_string()),
                ..Default::default()
            },
            ImportOptions::default(),
        )
        .unwrap();
    assert!(report.import.failed.is_empty(), "failed: {:?}", report.import.failed);
}

fn names(repo: &Repository) -> Vec<String> {
    repo.list(None)
        .unwrap()
        .iter()
        .map(|r| format!("{}/{}", r.kind, r.name))
        .collect()
}

#[test]
fn test_add_then_sync_then_remove_source() {
    let test = TestRepo::new();
    let repo = open(&test);
    let tools = SourceTree::new().command("deploy").skill("pdf");
    add_local(&repo, &tools, "tools");

    let _tools = tools.agent("reviewer");
    let report = repo.sync(SyncOptions::default()).unwrap();
    assert_eq!(report.totals().added.len(), 1);
    assert_eq!(
        names(&repo),
        vec!["agent/reviewer", "command/deploy", "skill/pdf"]
    );

    repo.remove_source("tools", RemoveSourceOptions::default()).unwrap();
    assert!(names(&repo).is_empty());
}

#[test]
fn test_adding_same_location_twice_is_rejected() {
    let test = TestRepo::new();
    let repo = open(&test);
    let tools = SourceTree::new().command("deploy");
    add_local(&repo, &tools, "tools");

    let err = repo
        .add_source(
            AddSourceRequest {
                location: tools.path().to_string_lossy().into_owned(),
                name: Some("again".into()),
                ..Default::default()
            },
            ImportOptions::default(),
        )
        .unwrap_err();

    assert!(err.to_string().contains("already registered"), "got: {err}");
    assert_eq!(Manifest::load(repo.root()).unwrap().sources.len(), 1);
}

#[test]
fn test_add_conflict_is_reported_per_resource() {
    let test = TestRepo::new();
    let repo = open(&test);
    let first = SourceTree::new().command("deploy");
    let second = SourceTree::new().command("deploy").command("status");
    add_local(&repo, &first, "first");

    let report = repo
        .add_source(
            AddSourceRequest {
                location: second.path().to_string_lossy().into_owned(),
                name: Some("second".into()),
                ..Default::default()
            },
            ImportOptions::default(),
        )
        .unwrap();

    assert_eq!(report.import.added.len(), 1);
    assert_eq!(report.import.failed.len(), 1);
    assert!(report.import.failed[0].message.contains("already exists"));
}

#[test]
fn test_add_with_filter_imports_matching_only() {
    let test = TestRepo::new();
    let repo = open(&test);
    let tools = SourceTree::new().skill("pdf-parser").skill("image-tool").command("pdf-cli");

    repo.add_source(
        AddSourceRequest {
            location: tools.path().to_string_lossy().into_owned(),
            ..Default::default()
        },
        ImportOptions {
            filter: Some(Pattern::new("skill/pdf*").unwrap()),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(names(&repo), vec!["skill/pdf-parser"]);
}

#[test]
fn test_verify_and_fix_after_manual_edits() {
    let test = TestRepo::new();
    let repo = open(&test);
    let tools = SourceTree::new().command("deploy").agent("reviewer");
    add_local(&repo, &tools, "tools");

    // Hand-added content and hand-deleted content
    fs::write(test.root().join("commands/manual.md"), "# manual").unwrap();
    fs::remove_file(test.root().join("agents/reviewer.md")).unwrap();

    let report = repo.verify(VerifyOptions::default()).unwrap();
    assert!(report.has_errors);
    assert!(report.has_warnings);
    assert_eq!(report.resources_without_metadata[0].name, "manual");
    assert_eq!(report.orphaned_metadata[0].name, "reviewer");

    let fixed = repo
        .verify(VerifyOptions {
            fix: true,
            ..Default::default()
        })
        .unwrap();
    assert!(!fixed.has_errors, "{fixed:?}");
    assert_eq!(fixed.fixes.len(), 2);

    assert!(repo.verify(VerifyOptions::default()).unwrap().is_clean());
}

#[test]
fn test_repair_dry_run_then_apply() {
    let test = TestRepo::new();
    let repo = open(&test);
    fs::create_dir_all(test.root().join("skills/manual")).unwrap();
    fs::write(test.root().join("skills/manual/SKILL.md"), "# manual").unwrap();

    let planned = repo.repair(true).unwrap();
    assert_eq!(planned.fixed_count, 1);
    test.assert_file_not_exists(".metadata/skills/manual-metadata.json");

    let applied = repo.repair(false).unwrap();
    assert_eq!(applied.fixed_count, 1);
    test.assert_file_exists(".metadata/skills/manual-metadata.json");
}

#[test]
fn test_rm_patterns_then_verify_clean() {
    let test = TestRepo::new();
    let repo = open(&test);
    let tools = SourceTree::new()
        .command("api/deploy")
        .command("api/status")
        .command("local");
    add_local(&repo, &tools, "tools");

    let report = repo
        .remove_resources(&["command/api/*".to_string()], false)
        .unwrap();

    assert_eq!(report.removed.len(), 2);
    assert_eq!(names(&repo), vec!["command/local"]);
    test.assert_file_not_exists("commands/api");
    assert!(repo.verify(VerifyOptions::default()).unwrap().is_clean());
}

#[test]
fn test_prune_removes_unreferenced_clones() {
    let test = TestRepo::new();
    let repo = open(&test);
    let remote = tempfile::TempDir::new().unwrap();
    aimgr_test_utils::git::commit_files(remote.path(), &[("agents/helper.md", "# helper")], "initial");
    let url = remote.path().to_string_lossy().into_owned();

    let mut manifest = Manifest::load(repo.root()).unwrap();
    manifest
        .add_source(aimgr_core::ManifestSource::from_url(url).with_name("remote"))
        .unwrap();
    manifest.save(repo.root()).unwrap();
    repo.sync(SyncOptions::default()).unwrap();
    fs::create_dir_all(test.root().join(".workspace/stale0000000000")).unwrap();

    let pruned = repo.prune(false).unwrap();
    assert_eq!(pruned.len(), 1);
    assert_eq!(pruned[0].key, "stale0000000000");

    repo.remove_source("remote", RemoveSourceOptions::default()).unwrap();
    let pruned = repo.prune(true).unwrap();
    assert_eq!(pruned.len(), 1);
    assert!(pruned[0].url.is_some(), "a real clone has an origin");
    assert_eq!(repo.prune(false).unwrap().len(), 1);
    assert!(repo.prune(false).unwrap().is_empty());
}

#[test]
fn test_workspace_is_not_committed() {
    let test = TestRepo::new();
    let repo = open(&test);
    fs::create_dir_all(test.root().join(".workspace/abc")).unwrap();
    fs::write(test.root().join(".workspace/abc/file"), "x").unwrap();
    fs::write(test.root().join("commands/manual.md"), "# manual").unwrap();

    repo.commit("manual changes").unwrap();

    let git = git2::Repository::open(test.root()).unwrap();
    assert!(git.status_should_ignore(std::path::Path::new(".workspace/abc/file")).unwrap());
    let head = git.head().unwrap().peel_to_tree().unwrap();
    assert!(head.get_path(std::path::Path::new("commands/manual.md")).is_ok());
    assert!(head.get_path(std::path::Path::new(".workspace")).is_err());
}
