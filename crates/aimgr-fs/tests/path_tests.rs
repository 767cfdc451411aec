use aimgr_fs::NormalizedPath;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

#[rstest]
#[case("foo/bar/baz", "foo/bar/baz")]
#[case("foo\\bar\\baz", "foo/bar/baz")]
#[case("foo/bar\\baz", "foo/bar/baz")]
fn test_normalizes_separators(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(NormalizedPath::new(input).as_str(), expected);
}

#[test]
fn test_join_nested_name() {
    let base = NormalizedPath::new("/repo/commands");
    assert_eq!(base.join("api/deploy.md").as_str(), "/repo/commands/api/deploy.md");
}

#[test]
fn test_join_trims_leading_slash() {
    let base = NormalizedPath::new("/repo/");
    assert_eq!(base.join("/skills").as_str(), "/repo/skills");
}

#[test]
fn test_parent_and_file_name() {
    let path = NormalizedPath::new("/repo/commands/api/deploy.md");
    assert_eq!(path.parent().unwrap().as_str(), "/repo/commands/api");
    assert_eq!(path.file_name(), Some("deploy.md"));
    assert_eq!(path.extension(), Some("md"));
}

#[test]
fn test_parent_of_root_child() {
    let path = NormalizedPath::new("/repo");
    assert_eq!(path.parent().unwrap().as_str(), "/");
}

#[test]
fn test_extension_ignores_dotfiles() {
    assert_eq!(NormalizedPath::new("/repo/.gitignore").extension(), None);
}

#[test]
fn test_relative_to() {
    let base = NormalizedPath::new("/repo/commands");
    let path = NormalizedPath::new("/repo/commands/api/deploy.md");
    assert_eq!(path.relative_to(&base), Some("api/deploy.md"));
    assert_eq!(base.relative_to(&base), Some(""));
}

#[test]
fn test_relative_to_rejects_sibling_prefix() {
    let base = NormalizedPath::new("/repo/commands");
    let path = NormalizedPath::new("/repo/commands-old/x.md");
    assert_eq!(path.relative_to(&base), None);
}

#[test]
fn test_absolute_keeps_missing_paths() {
    let path = NormalizedPath::absolute("/definitely/not/here").unwrap();
    assert!(path.as_str().ends_with("/definitely/not/here"));
}

#[test]
fn test_absolute_canonicalizes_existing_paths() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("dir")).unwrap();
    let dotted = temp.path().join("dir").join("..").join("dir");

    let path = NormalizedPath::absolute(&dotted).unwrap();

    assert!(!path.as_str().contains(".."));
    assert!(path.as_str().ends_with("/dir"));
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_is_present_but_not_existing() {
    let temp = TempDir::new().unwrap();
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(temp.path().join("missing"), &link).unwrap();

    let path = NormalizedPath::new(&link);
    assert!(!path.exists());
    assert!(path.is_present());
    assert!(path.is_symlink());
}
