//! aimgr CLI
//!
//! The command-line interface for managing a repository of AI resources.

mod cli;
mod commands;
mod error;
mod output;

use std::io;

use aimgr_core::{ConfigResolver, CreatePackageRequest, RemoveSourceOptions, SyncOptions};
use aimgr_fs::NormalizedPath;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, OutputFormat};
use commands::AddArgs;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        println!("{} AI resource repository manager", "aimgr".green().bold());
        println!();
        println!("Run {} for available commands.", "aimgr --help".cyan());
        return Ok(());
    };

    if let Commands::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "aimgr", &mut io::stdout());
        return Ok(());
    }

    let root = ConfigResolver::new().repo_path(cli.repo.as_deref())?;
    tracing::debug!(root = %root, "resolved repository root");
    execute_command(command, &root, cli.format)
}

/// Log to stderr so JSON and YAML output stay parseable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(io::stderr)
        .try_init();
    if installed.is_ok() {
        tracing::debug!("Verbose mode enabled");
    }
}

fn execute_command(cmd: Commands, root: &NormalizedPath, format: OutputFormat) -> Result<()> {
    match cmd {
        Commands::Init => commands::run_init(root, format),
        Commands::Drop { force } => commands::run_drop(root, force, format),
        Commands::Add {
            location,
            name,
            reference,
            subpath,
            force,
            skip_existing,
            dry_run,
            filter,
        } => commands::run_add(
            root,
            AddArgs {
                location,
                name,
                reference,
                subpath,
                force,
                skip_existing,
                dry_run,
                filter,
            },
            format,
        ),
        Commands::Remove {
            source,
            dry_run,
            keep_resources,
        } => commands::run_remove(
            root,
            &source,
            RemoveSourceOptions {
                dry_run,
                keep_resources,
            },
            format,
        ),
        Commands::Sync {
            skip_existing,
            dry_run,
        } => commands::run_sync(
            root,
            SyncOptions {
                skip_existing,
                dry_run,
            },
            format,
        ),
        Commands::List { pattern } => commands::run_list(root, pattern.as_deref(), format),
        Commands::Rm { patterns, dry_run } => commands::run_rm(root, &patterns, dry_run, format),
        Commands::CreatePackage {
            name,
            description,
            resources,
            force,
        } => commands::run_create_package(
            root,
            CreatePackageRequest {
                name,
                description,
                resources,
                force,
            },
            format,
        ),
        Commands::Info => commands::run_info(root, format),
        Commands::Show { pattern } => commands::run_show(root, &pattern, format),
        Commands::Verify { pattern, fix, json } => {
            let format = if json { OutputFormat::Json } else { format };
            commands::run_verify(root, pattern.as_deref(), fix, format)
        }
        Commands::Repair { dry_run } => commands::run_repair(root, dry_run, format),
        Commands::Prune { dry_run } => commands::run_prune(root, dry_run, format),
        Commands::Completions { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimgr_test_utils::SourceTree;
    use tempfile::TempDir;

    #[test]
    fn test_execute_init_then_list() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path());

        execute_command(Commands::Init, &root, OutputFormat::Table).unwrap();
        let result = execute_command(Commands::List { pattern: None }, &root, OutputFormat::Json);

        assert!(result.is_ok());
    }

    #[test]
    fn test_execute_add_and_sync() {
        let temp_dir = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp_dir.path());
        let source = SourceTree::new().agent("reviewer");

        execute_command(
            Commands::Add {
                location: source.path().to_string_lossy().into_owned(),
                name: None,
                reference: None,
                subpath: None,
                force: false,
                skip_existing: false,
                dry_run: false,
                filter: None,
            },
            &root,
            OutputFormat::Table,
        )
        .unwrap();
        let result = execute_command(
            Commands::Sync {
                skip_existing: false,
                dry_run: true,
            },
            &root,
            OutputFormat::Yaml,
        );

        assert!(result.is_ok());
        assert!(temp_dir.path().join("agents/reviewer.md").exists());
    }

    #[test]
    fn test_cli_error_user() {
        let error = crate::error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }
}
