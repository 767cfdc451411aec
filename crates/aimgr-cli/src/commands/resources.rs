//! List and rm commands

use aimgr_core::{Pattern, Repository};
use aimgr_fs::NormalizedPath;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;

/// Run the list command
pub fn run_list(root: &NormalizedPath, pattern: Option<&str>, format: OutputFormat) -> Result<()> {
    let pattern = pattern.map(Pattern::new).transpose()?;
    let resources = Repository::new(root.clone()).list(pattern.as_ref())?;
    if output::emit(format, &resources)? {
        return Ok(());
    }

    if resources.is_empty() {
        println!("{}", "No resources found.".dimmed());
        return Ok(());
    }

    println!(
        "{:<10} {:<40} {}",
        "TYPE".bold(),
        "NAME".bold(),
        "SOURCE".bold()
    );
    for resource in &resources {
        println!(
            "{:<10} {:<40} {}",
            resource.kind.to_string(),
            resource.name.green(),
            resource.source_name.as_deref().unwrap_or("-").dimmed()
        );
    }
    println!();
    println!("{} {} resource(s)", "Total:".dimmed(), resources.len());
    Ok(())
}

/// Run the rm command
pub fn run_rm(
    root: &NormalizedPath,
    patterns: &[String],
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let report = Repository::new(root.clone()).remove_resources(patterns, dry_run)?;
    if output::emit(format, &report)? {
        return Ok(());
    }

    if report.removed.is_empty() {
        println!("{}", "Nothing matched.".dimmed());
        return Ok(());
    }
    let removed = output::verb(dry_run, "remove", "Removed");
    for resource in &report.removed {
        println!("   {} {removed} {}", "-".red(), resource.to_string().cyan());
    }
    Ok(())
}
