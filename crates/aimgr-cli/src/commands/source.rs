//! Add and remove source commands

use aimgr_core::{AddSourceRequest, ImportOptions, Pattern, RemoveSourceOptions, Repository};
use aimgr_fs::NormalizedPath;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;

/// Arguments of the add command
#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    pub location: String,
    pub name: Option<String>,
    pub reference: Option<String>,
    pub subpath: Option<String>,
    pub force: bool,
    pub skip_existing: bool,
    pub dry_run: bool,
    pub filter: Option<String>,
}

/// Run the add command
pub fn run_add(root: &NormalizedPath, args: AddArgs, format: OutputFormat) -> Result<()> {
    let filter = args.filter.as_deref().map(Pattern::new).transpose()?;
    let options = ImportOptions {
        force: args.force,
        skip_existing: args.skip_existing,
        dry_run: args.dry_run,
        filter,
        ..Default::default()
    };
    let request = AddSourceRequest {
        location: args.location,
        name: args.name,
        reference: args.reference,
        subpath: args.subpath,
    };

    let report = Repository::new(root.clone()).add_source(request, options)?;
    if output::emit(format, &report)? {
        return Ok(());
    }

    println!(
        "{} {} source {} ({})",
        "=>".blue().bold(),
        output::verb(args.dry_run, "add", "Added"),
        report.source.name.cyan(),
        report.source.id.dimmed()
    );
    output::print_import(&report.import, "   ");
    Ok(())
}

/// Run the remove command
pub fn run_remove(
    root: &NormalizedPath,
    source: &str,
    options: RemoveSourceOptions,
    format: OutputFormat,
) -> Result<()> {
    let report = Repository::new(root.clone()).remove_source(source, options)?;
    if output::emit(format, &report)? {
        return Ok(());
    }

    let removed = output::verb(report.dry_run, "remove", "Removed");
    println!(
        "{} {removed} source {}",
        "=>".blue().bold(),
        report.source.name.cyan()
    );

    if report.resources.is_empty() {
        println!("   {}", "No resources owned by this source.".dimmed());
    } else if report.resources_removed {
        for resource in &report.resources {
            println!("   {} {removed} {resource}", "-".red());
        }
    } else {
        println!(
            "   {} Kept {} resource(s)",
            "=".dimmed(),
            report.resources.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimgr_test_utils::SourceTree;
    use tempfile::TempDir;

    #[test]
    fn test_add_then_remove_source() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path());
        let source = SourceTree::new().command("deploy");

        run_add(
            &root,
            AddArgs {
                location: source.path().to_string_lossy().into_owned(),
                name: Some("tools".into()),
                ..Default::default()
            },
            OutputFormat::Table,
        )
        .unwrap();
        assert!(temp_dir.path().join("commands/deploy.md").exists());

        run_remove(&root, "tools", RemoveSourceOptions::default(), OutputFormat::Table).unwrap();
        assert!(!temp_dir.path().join("commands/deploy.md").exists());
    }

    #[test]
    fn test_add_rejects_bad_filter() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path());

        let result = run_add(
            &root,
            AddArgs {
                location: temp_dir.path().to_string_lossy().into_owned(),
                filter: Some(String::new()),
                ..Default::default()
            },
            OutputFormat::Table,
        );

        assert!(result.is_err());
    }
}
