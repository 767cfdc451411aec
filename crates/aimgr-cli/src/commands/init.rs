//! Init and drop commands

use aimgr_core::Repository;
use aimgr_fs::NormalizedPath;
use colored::Colorize;
use dialoguer::Confirm;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;

/// Run the init command
pub fn run_init(root: &NormalizedPath, format: OutputFormat) -> Result<()> {
    let report = Repository::new(root.clone()).init()?;
    if output::emit(format, &report)? {
        return Ok(());
    }

    if report.created_manifest {
        println!(
            "{} Initialized repository at {}",
            "OK".green().bold(),
            report.root.cyan()
        );
    } else {
        println!(
            "{} Repository already initialized at {}",
            "OK".green().bold(),
            report.root.cyan()
        );
    }
    if report.updated_gitignore {
        println!("   {} Added .workspace/ to .gitignore", "+".green());
    }
    if report.initialized_git {
        println!("   {} Created Git repository", "+".green());
    }
    Ok(())
}

/// Run the drop command
///
/// Asks for confirmation unless `force` is set.
pub fn run_drop(root: &NormalizedPath, force: bool, format: OutputFormat) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete every resource and source in {}?",
                root.as_str()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let report = Repository::new(root.clone()).drop_all()?;
    if output::emit(format, &report)? {
        return Ok(());
    }
    println!(
        "{} Repository reset at {}",
        "OK".green().bold(),
        report.root.cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path().join("repo"));

        run_init(&root, OutputFormat::Table).unwrap();

        assert!(temp_dir.path().join("repo/ai.repo.yaml").is_file());
        assert!(temp_dir.path().join("repo/skills").is_dir());
    }

    #[test]
    fn test_forced_drop_clears_content() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path());
        run_init(&root, OutputFormat::Table).unwrap();
        std::fs::write(temp_dir.path().join("commands/x.md"), "# x").unwrap();

        run_drop(&root, true, OutputFormat::Json).unwrap();

        assert!(!temp_dir.path().join("commands/x.md").exists());
        assert!(temp_dir.path().join("ai.repo.yaml").is_file());
    }
}
