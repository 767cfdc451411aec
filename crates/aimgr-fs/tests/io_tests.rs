use aimgr_fs::{NormalizedPath, io};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join(".metadata/commands/x-metadata.json"));

    io::write_atomic(&path, b"{}").unwrap();

    assert_eq!(fs::read_to_string(path.to_native()).unwrap(), "{}");
}

#[test]
fn test_write_atomic_overwrites_and_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("test.txt");
    fs::write(&file_path, "original").unwrap();

    io::write_text(&NormalizedPath::new(&file_path), "updated").unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_read_text_nonexistent_file_is_not_found() {
    let err = io::read_text(&NormalizedPath::new("/nonexistent/file.txt")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_copy_dir_recursive() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src-skill");
    fs::create_dir_all(src.join("scripts")).unwrap();
    fs::write(src.join("SKILL.md"), "# skill").unwrap();
    fs::write(src.join("scripts/run.sh"), "echo hi").unwrap();

    let dest = NormalizedPath::new(temp.path().join("repo/skills/my-skill"));
    io::copy_dir(&src, &dest).unwrap();

    assert_eq!(fs::read_to_string(dest.join("SKILL.md").to_native()).unwrap(), "# skill");
    assert_eq!(
        fs::read_to_string(dest.join("scripts/run.sh").to_native()).unwrap(),
        "echo hi"
    );
}

#[test]
fn test_copy_dir_rejects_files() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("file.md");
    fs::write(&file, "x").unwrap();

    let result = io::copy_dir(&file, &NormalizedPath::new(temp.path().join("out")));
    assert!(matches!(result, Err(aimgr_fs::Error::NotADirectory { .. })));
}

#[test]
fn test_disk_usage_sums_files_and_skips_named_dirs() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("skills/pdf")).unwrap();
    fs::create_dir_all(temp.path().join(".git/objects")).unwrap();
    fs::write(temp.path().join("skills/pdf/SKILL.md"), "12345").unwrap();
    fs::write(temp.path().join("ai.repo.yaml"), "abc").unwrap();
    fs::write(temp.path().join(".git/objects/blob"), "ignored bytes").unwrap();

    assert_eq!(io::disk_usage(temp.path(), &[".git"]).unwrap(), 8);
    assert_eq!(io::disk_usage(temp.path(), &[]).unwrap(), 21);
}

#[test]
fn test_remove_entry_missing_returns_false() {
    let temp = TempDir::new().unwrap();
    let removed = io::remove_entry(&NormalizedPath::new(temp.path().join("nothing"))).unwrap();
    assert!(!removed);
}

#[test]
fn test_remove_entry_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("skill");
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("nested/file"), "x").unwrap();

    assert!(io::remove_entry(&NormalizedPath::new(&dir)).unwrap());
    assert!(!dir.exists());
}

#[cfg(unix)]
#[test]
fn test_symlink_and_remove_keeps_target() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("source/commands/test.md");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, "# test").unwrap();

    let link = NormalizedPath::new(temp.path().join("repo/commands/test.md"));
    io::symlink(&target, &link).unwrap();
    assert!(link.is_symlink());
    assert_eq!(fs::read_to_string(link.to_native()).unwrap(), "# test");

    assert!(io::remove_entry(&link).unwrap());
    assert!(!link.is_present());
    assert!(target.exists());
}

#[test]
fn test_prune_empty_dirs_stops_at_root() {
    let temp = TempDir::new().unwrap();
    let root = NormalizedPath::new(temp.path().join("commands"));
    let nested = root.join("api/v1");
    io::ensure_dir(&nested).unwrap();
    fs::write(root.join("keep.md").to_native(), "x").unwrap();

    io::prune_empty_dirs(&nested, &root);

    assert!(!root.join("api").exists());
    assert!(root.exists());
}
