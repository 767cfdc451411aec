//! Info and show commands

use aimgr_core::{Pattern, RepoInfo, Repository, ResourceDetails, SourceType};
use aimgr_fs::NormalizedPath;
use chrono::Utc;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;

/// Run the info command
pub fn run_info(root: &NormalizedPath, format: OutputFormat) -> Result<()> {
    let repository = Repository::new(root.clone());
    if format == OutputFormat::Table && !repository.is_initialized() {
        println!("{} Repository not initialized at {root}", "WARNING".yellow().bold());
        println!("Run {} to create it.", "aimgr init".cyan());
        return Ok(());
    }

    let info = repository.info()?;
    if !output::emit(format, &info)? {
        print_info(&info);
    }
    Ok(())
}

fn print_info(info: &RepoInfo) {
    println!("{} {}", "Repository:".bold(), info.root);
    println!();
    println!("{} {}", "Resources:".bold(), info.total);
    let counts = &info.counts;
    for (label, count) in [
        ("Commands", counts.commands),
        ("Skills", counts.skills),
        ("Agents", counts.agents),
        ("Packages", counts.packages),
    ] {
        println!("   {label:<10} {count}");
    }
    println!();
    println!("{} {}", "Disk usage:".bold(), output::format_bytes(info.disk_usage));
    println!();

    if info.sources.is_empty() {
        println!(
            "{} 0 (use {} to add one)",
            "Sources:".bold(),
            "aimgr add".cyan()
        );
        return;
    }
    println!("{} {}", "Sources:".bold(), info.sources.len());
    let now = Utc::now();
    for source in &info.sources {
        let health = if source.available {
            "OK".green().bold()
        } else {
            "MISSING".red().bold()
        };
        let kind = if source.source_type == SourceType::Local {
            "local"
        } else {
            "remote"
        };
        let reference = source
            .reference
            .as_deref()
            .map(|r| format!(" @{r}"))
            .unwrap_or_default();
        let synced = source
            .last_synced
            .map(|t| output::time_since(t, now))
            .unwrap_or_else(|| "never".to_string());
        println!(
            "   {health} {} ({kind}: {}{reference}) [{}] {} resource(s), synced {synced}",
            source.name.cyan(),
            source.location,
            source.mode.as_str(),
            source.resources
        );
    }
}

/// Run the show command
///
/// A single match is shown in full; several matches as a table.
pub fn run_show(root: &NormalizedPath, pattern: &str, format: OutputFormat) -> Result<()> {
    let pattern = Pattern::new(pattern)?;
    let details = Repository::new(root.clone()).show(&pattern)?;
    if output::emit(format, &details)? {
        return Ok(());
    }

    if let [single] = details.as_slice() {
        print_details(single);
        return Ok(());
    }

    println!("Found {} matching resource(s):", details.len());
    println!();
    println!("{:<10} {:<40} {}", "TYPE".bold(), "NAME".bold(), "SOURCE".bold());
    for detail in &details {
        let source = detail
            .metadata
            .as_ref()
            .and_then(|m| m.source_name.clone())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<40} {}",
            detail.kind.to_string(),
            detail.name.green(),
            source.dimmed()
        );
    }
    println!();
    println!("Use {} for details.", "aimgr show <type>/<name>".cyan());
    Ok(())
}

fn print_details(detail: &ResourceDetails) {
    println!("{} {}/{}", "=>".blue().bold(), detail.kind, detail.name.cyan());
    println!("   {:<16} {}", "Location:", detail.path);

    match &detail.metadata {
        Some(record) => {
            println!(
                "   {:<16} {}",
                "Source:",
                record.source_name.as_deref().unwrap_or("-")
            );
            println!("   {:<16} {}", "Source type:", record.source_type);
            if !record.source_url.is_empty() {
                println!("   {:<16} {}", "Source URL:", record.source_url);
            }
            if let Some(reference) = &record.reference {
                println!("   {:<16} {reference}", "Ref:");
            }
            println!(
                "   {:<16} {}",
                "First installed:",
                record.first_installed.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "   {:<16} {}",
                "Last updated:",
                record.last_updated.format("%Y-%m-%d %H:%M:%S")
            );
        }
        None => println!("   {:<16} {}", "Metadata:", "not available".yellow()),
    }

    if let Some(package) = &detail.package {
        println!("   {:<16} {}", "Description:", package.description);
        println!("   {}", "Resources:".dimmed());
        for reference in &package.resources {
            println!("     - {reference}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_info_on_missing_repository_is_not_an_error_in_table_format() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path().join("absent"));

        assert!(run_info(&root, OutputFormat::Table).is_ok());
        assert!(run_info(&root, OutputFormat::Json).is_err());
    }

    #[test]
    fn test_show_single_and_multiple_matches() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path());
        Repository::new(root.clone()).init().unwrap();
        fs::write(temp_dir.path().join("agents/a.md"), "# a").unwrap();
        fs::write(temp_dir.path().join("agents/b.md"), "# b").unwrap();

        assert!(run_show(&root, "agent/a", OutputFormat::Table).is_ok());
        assert!(run_show(&root, "agent/*", OutputFormat::Table).is_ok());
        assert!(run_show(&root, "skill/*", OutputFormat::Table).is_err());
    }
}
