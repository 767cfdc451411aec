//! Prune command implementation

use aimgr_core::Repository;
use aimgr_fs::NormalizedPath;
use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;

#[derive(Debug, Serialize)]
struct PrunedClone {
    key: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PruneReport {
    pruned: Vec<PrunedClone>,
    dry_run: bool,
}

/// Run the prune command
pub fn run_prune(root: &NormalizedPath, dry_run: bool, format: OutputFormat) -> Result<()> {
    let pruned = Repository::new(root.clone()).prune(dry_run)?;
    let report = PruneReport {
        pruned: pruned
            .into_iter()
            .map(|clone| PrunedClone {
                key: clone.key,
                path: clone.path.to_string(),
                url: clone.url,
            })
            .collect(),
        dry_run,
    };
    if output::emit(format, &report)? {
        return Ok(());
    }

    if report.pruned.is_empty() {
        println!("{} No unreferenced clones in the workspace cache.", "OK".green().bold());
        return Ok(());
    }
    let removed = output::verb(dry_run, "remove", "Removed");
    for clone in &report.pruned {
        println!(
            "   {} {removed} {} {}",
            "-".red(),
            clone.key.cyan(),
            clone.url.as_deref().unwrap_or("(not a git repository)").dimmed()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prune_removes_stray_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path());
        Repository::new(root.clone()).init().unwrap();
        let stray = temp_dir.path().join(".workspace/0123456789abcdef");
        std::fs::create_dir_all(&stray).unwrap();

        run_prune(&root, true, OutputFormat::Table).unwrap();
        assert!(stray.exists());

        run_prune(&root, false, OutputFormat::Table).unwrap();
        assert!(!stray.exists());
    }
}
