//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// aimgr - Manage a repository of AI commands, skills, agents and packages
#[derive(Parser, Debug)]
#[command(name = "aimgr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository root (defaults to the configured or platform location)
    #[arg(long, global = true, env = "AIMGR_REPO_PATH")]
    pub repo: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// How reports are rendered on stdout
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create the repository layout, manifest and Git repository
    Init,

    /// Delete the repository and initialize it again
    Drop {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Register a source and import its resources
    ///
    /// Examples:
    ///   aimgr add ~/my-prompts
    ///   aimgr add gh:owner/repo --ref v1.2.0
    ///   aimgr add https://github.com/owner/repo --subpath tools --filter 'skill/*'
    Add {
        /// Local directory or Git URL
        location: String,

        /// Source name (derived from the location when omitted)
        #[arg(long)]
        name: Option<String>,

        /// Branch, tag or commit for Git sources
        #[arg(long = "ref")]
        reference: Option<String>,

        /// Directory inside the source to import from
        #[arg(long)]
        subpath: Option<String>,

        /// Overwrite resources that already exist
        #[arg(long, conflicts_with = "skip_existing")]
        force: bool,

        /// Keep resources that already exist
        #[arg(long)]
        skip_existing: bool,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Only import resources matching this pattern
        #[arg(long)]
        filter: Option<String>,
    },

    /// Unregister a source
    Remove {
        /// Source ID, name, path or URL
        source: String,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Leave the source's resources in the repository
        #[arg(long)]
        keep_resources: bool,
    },

    /// Re-import every source and remove resources they no longer provide
    Sync {
        /// Keep resources that already exist instead of overwriting them
        #[arg(long)]
        skip_existing: bool,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// List resources in the repository
    ///
    /// Examples:
    ///   aimgr list
    ///   aimgr list 'skill/pdf*'
    List {
        /// Only list resources matching this pattern
        pattern: Option<String>,
    },

    /// Remove resources and their metadata
    Rm {
        /// Resource references or patterns (`command/deploy`, `skill/*`)
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Build a package from resources already in the repository
    ///
    /// Examples:
    ///   aimgr create-package web-tools --description "Web tooling" --resources command/deploy,skill/pdf
    ///   aimgr create-package docs --description "Docs helpers" --resources 'skill/doc*' --force
    CreatePackage {
        /// Package name
        name: String,

        /// What the package is for
        #[arg(long)]
        description: String,

        /// Comma-separated resource references or patterns
        #[arg(long, value_delimiter = ',', required = true)]
        resources: Vec<String>,

        /// Overwrite an existing package
        #[arg(long)]
        force: bool,
    },

    /// Show repository location, resource counts, disk usage and sources
    Info,

    /// Show details of the resources matching a pattern
    ///
    /// Examples:
    ///   aimgr show skill/pdf
    ///   aimgr show '*deploy*'
    Show {
        /// Resource reference or pattern
        pattern: String,
    },

    /// Check that resources and metadata agree
    Verify {
        /// Only check resources matching this pattern
        pattern: Option<String>,

        /// Create missing metadata and delete orphaned metadata
        #[arg(long)]
        fix: bool,

        /// Shorthand for --format json
        #[arg(long)]
        json: bool,
    },

    /// Apply every automatic repair
    Repair {
        /// Preview repairs without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove cached clones no source refers to
    Prune {
        /// Preview without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   aimgr completions bash > ~/.local/share/bash-completion/completions/aimgr
    ///   aimgr completions zsh > ~/.zfunc/_aimgr
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
