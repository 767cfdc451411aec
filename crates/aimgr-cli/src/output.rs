//! Rendering helpers shared by the commands

use aimgr_core::{ImportEntry, ImportReport};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;

/// Print `value` as JSON or YAML.
///
/// Returns false for table output, which each command renders itself.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Table => Ok(false),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
            Ok(true)
        }
    }
}

/// Prefix for lines describing something that did not happen yet.
pub fn would(dry_run: bool) -> &'static str {
    if dry_run { "[dry-run] Would " } else { "" }
}

/// `"[dry-run] Would add"` in dry run, `"Added"` otherwise.
pub fn verb(dry_run: bool, planned: &str, done: &str) -> String {
    if dry_run {
        format!("{}{planned}", would(true))
    } else {
        done.to_string()
    }
}

/// Per-resource lines plus a summary for an import batch.
pub fn print_import(report: &ImportReport, indent: &str) {
    let dry_run = report.dry_run;
    let line = |marker: colored::ColoredString, verbs: [&str; 2], entry: &ImportEntry| {
        let verb = verb(dry_run, verbs[0], verbs[1]);
        let detail = if entry.message.is_empty() {
            String::new()
        } else {
            format!(" ({})", entry.message.dimmed())
        };
        println!(
            "{indent}{marker} {verb} {}/{}{detail}",
            entry.kind,
            entry.name.cyan()
        );
    };

    for entry in &report.added {
        line("+".green(), ["add", "Added"], entry);
    }
    for entry in &report.updated {
        line("~".yellow(), ["update", "Updated"], entry);
    }
    for entry in &report.skipped {
        line("=".dimmed(), ["skip", "Skipped"], entry);
    }
    for entry in &report.failed {
        line("!".red(), ["fail", "Failed"], entry);
    }

    let counts = &report.counts;
    println!(
        "{indent}{} {} ({} commands, {} skills, {} agents, {} packages)",
        "Summary:".dimmed(),
        report.summary(),
        counts.commands,
        counts.skills,
        counts.agents,
        counts.packages
    );
}

/// `1536` as `"1.5 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: &[char] = &['K', 'M', 'G', 'T', 'P', 'E'];
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp + 1 < PREFIXES.len() {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}

/// Coarse age of `then`, such as `"3h ago"`.
pub fn time_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    let hours = minutes / 60;
    let days = hours / 24;
    if minutes < 1 {
        "just now".to_string()
    } else if hours < 1 {
        format!("{minutes}m ago")
    } else if days < 1 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else if days < 30 {
        format!("{}w ago", days / 7)
    } else if days < 365 {
        format!("{}mo ago", days / 30)
    } else {
        format!("{}y ago", days / 365)
    }
}
