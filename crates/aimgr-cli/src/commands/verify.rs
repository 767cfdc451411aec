//! Verify and repair commands

use aimgr_core::{Pattern, Repository, VerifyOptions, VerifyReport};
use aimgr_fs::NormalizedPath;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::error::{CliError, Result};
use crate::output;

/// Run the verify command
///
/// Fails after rendering when errors remain.
pub fn run_verify(
    root: &NormalizedPath,
    pattern: Option<&str>,
    fix: bool,
    format: OutputFormat,
) -> Result<()> {
    let filter = pattern.map(Pattern::new).transpose()?;
    let report = Repository::new(root.clone()).verify(VerifyOptions {
        fix,
        dry_run: false,
        filter,
    })?;

    if !output::emit(format, &report)? {
        print_verify(&report);
    }

    if report.has_errors {
        return Err(CliError::user("Verification found errors"));
    }
    Ok(())
}

fn print_verify(report: &VerifyReport) {
    println!("{} Verifying repository...", "=>".blue().bold());

    if report.is_clean() && report.fixes.is_empty() {
        println!("{} Repository is consistent.", "OK".green().bold());
        return;
    }

    let section = |title: colored::ColoredString, lines: Vec<String>| {
        if lines.is_empty() {
            return;
        }
        println!("{title}");
        for line in lines {
            println!("   {line}");
        }
    };

    // Repaired issues are listed under "Fixed" instead
    let fixed = !report.fixes.is_empty();
    section(
        "WARNING: resources without metadata".yellow().bold(),
        report
            .remaining_without_metadata()
            .map(|i| format!("{}/{} ({})", i.kind, i.name, i.path.dimmed()))
            .collect(),
    );
    section(
        "WARNING: source path no longer exists".yellow().bold(),
        report
            .missing_source_paths
            .iter()
            .map(|i| {
                format!(
                    "{}/{} ({})",
                    i.kind,
                    i.name,
                    i.source_path.as_deref().unwrap_or("-").dimmed()
                )
            })
            .collect(),
    );
    section(
        "ERROR: orphaned metadata".red().bold(),
        report
            .remaining_orphaned()
            .map(|i| format!("{}/{} ({})", i.kind, i.name, i.path.dimmed()))
            .collect(),
    );
    section(
        "ERROR: type mismatches".red().bold(),
        report
            .type_mismatches
            .iter()
            .map(|m| {
                format!(
                    "{}: resource is a {}, metadata says {}",
                    m.name, m.resource_type, m.metadata_type
                )
            })
            .collect(),
    );
    section(
        "ERROR: packages with missing resources".red().bold(),
        report
            .packages_with_missing_refs
            .iter()
            .map(|p| format!("{}: {}", p.name, p.missing_resources.join(", ")))
            .collect(),
    );
    section(
        "ERROR: unreadable metadata".red().bold(),
        report.unreadable_metadata.clone(),
    );

    if fixed {
        println!("{}", "Fixed:".green().bold());
        for fix in &report.fixes {
            println!("   {} {}", "+".green(), fix);
        }
    }
    for error in &report.fix_errors {
        println!("   {} {}", "!".red(), error);
    }

    println!();
    println!("{} {}", "Summary:".bold(), report.summary());
    if report.fixable_count() > 0 && !fixed {
        println!("Run {} to repair.", "aimgr verify --fix".cyan());
    }
}

/// Run the repair command
pub fn run_repair(root: &NormalizedPath, dry_run: bool, format: OutputFormat) -> Result<()> {
    let report = Repository::new(root.clone()).repair(dry_run)?;
    if output::emit(format, &report)? {
        return Ok(());
    }

    println!("{} Repairing repository...", "=>".blue().bold());
    for action in &report.actions {
        println!("   {} {}", "+".green(), action);
    }
    for error in &report.errors {
        println!("   {} {}", "!".red(), error);
    }
    if report.unfixable_count > 0 {
        println!(
            "{} {} issue(s) need manual attention; run {} for details.",
            "WARNING".yellow().bold(),
            report.unfixable_count,
            "aimgr verify".cyan()
        );
    }
    println!("{} {}", "Summary:".bold(), report.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init(dir: &std::path::Path) -> NormalizedPath {
        let root = NormalizedPath::new(dir);
        Repository::new(root.clone()).init().unwrap();
        root
    }

    #[test]
    fn test_verify_clean_repository() {
        let temp_dir = TempDir::new().unwrap();
        let root = init(temp_dir.path());

        assert!(run_verify(&root, None, false, OutputFormat::Table).is_ok());
    }

    #[test]
    fn test_verify_fix_then_passes() {
        let temp_dir = TempDir::new().unwrap();
        let root = init(temp_dir.path());
        fs::write(temp_dir.path().join("agents/manual.md"), "# manual").unwrap();

        // Missing metadata is a warning, not an error
        assert!(run_verify(&root, None, false, OutputFormat::Table).is_ok());
        run_verify(&root, None, true, OutputFormat::Table).unwrap();

        assert!(temp_dir.path().join(".metadata/agents/manual-metadata.json").exists());
    }

    #[test]
    fn test_verify_fails_on_orphaned_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let root = init(temp_dir.path());
        fs::create_dir_all(temp_dir.path().join(".metadata/commands")).unwrap();
        fs::write(
            temp_dir.path().join(".metadata/commands/ghost-metadata.json"),
            r#"{"name":"ghost","type":"command","source_type":"local","source_url":"","first_installed":"2024-01-01T00:00:00Z","last_updated":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert!(run_verify(&root, None, false, OutputFormat::Json).is_err());
        assert!(run_repair(&root, false, OutputFormat::Table).is_ok());
        assert!(run_verify(&root, None, false, OutputFormat::Table).is_ok());
    }
}
