//! Create-package command

use aimgr_core::{CreatePackageRequest, Repository};
use aimgr_fs::NormalizedPath;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;

/// Run the create-package command
pub fn run_create_package(
    root: &NormalizedPath,
    mut request: CreatePackageRequest,
    format: OutputFormat,
) -> Result<()> {
    request.resources = request
        .resources
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    let package = Repository::new(root.clone()).create_package(request)?;
    if output::emit(format, &package)? {
        return Ok(());
    }

    println!(
        "{} Created package {} ({} resource(s))",
        "OK".green().bold(),
        package.name.cyan(),
        package.resources.len()
    );
    println!("   {} {}", "Description:".dimmed(), package.description);
    for reference in &package.resources {
        println!("   {} {reference}", "-".dimmed());
    }
    Ok(())
}
