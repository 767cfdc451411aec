//! Sync command implementation

use aimgr_core::{Repository, SourceStatus, SyncOptions, SyncReport};
use aimgr_fs::NormalizedPath;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;

/// Run the sync command
///
/// The report is always rendered; the command fails afterwards when every
/// source failed.
pub fn run_sync(root: &NormalizedPath, options: SyncOptions, format: OutputFormat) -> Result<()> {
    let report = Repository::new(root.clone()).sync(options)?;

    if !output::emit(format, &report)? {
        println!(
            "{} Synchronizing {} source(s)...",
            "=>".blue().bold(),
            report.sources.len()
        );

        for source in &report.sources {
            match source.status {
                SourceStatus::Synced => {
                    println!("{} {}", "OK".green().bold(), source.name.cyan());
                    output::print_import(&source.import, "   ");
                }
                SourceStatus::Failed => {
                    println!(
                        "{} {}: {}",
                        "FAILED".red().bold(),
                        source.name.cyan(),
                        source.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }

        if !report.actions.is_empty() {
            println!();
            for action in &report.actions {
                println!("   {} {}", "-".red(), action);
            }
        }
        for error in &report.errors {
            println!("   {} {}", "!".red(), error);
        }

        println!();
        println!("{} {}", "Summary:".bold(), summary_line(&report));
        if !report.changed() && report.failed_sources() == 0 && report.errors.is_empty() {
            println!("{} Already synchronized. No changes needed.", "OK".green().bold());
        }
    }

    report.ensure_success()?;
    Ok(())
}

/// Per-outcome counts, with removal failures when there were any.
fn summary_line(report: &SyncReport) -> String {
    let summary = report.summary();
    if report.errors.is_empty() {
        summary
    } else {
        format!("{summary}, {} removal(s) failed", report.errors.len())
    }
}
