use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hvfiles")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative file artifacts on Hyper-V hosts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/config.toml)
    #[arg(short, long, global = true, env = "HVFILES_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show declared and recorded files with their host state
    Status,

    /// Preview what apply would change
    Diff(PlanArgs),

    /// Make the host match the declared files
    Apply(ApplyArgs),

    /// Run a single operation against the host
    #[command(subcommand)]
    File(FileCommand),

    /// Print the PowerShell script a template renders to
    Render(RenderArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Number of parallel reads while refreshing
    #[arg(short, long, default_value = "4")]
    pub jobs: u8,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Show what would change without touching the host
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: u8,
}

#[derive(Subcommand)]
pub enum FileCommand {
    /// Materialize a file from a URL or host path
    Create {
        /// Absolute path on the host
        path: String,
        /// URL or host-local path
        source: String,
    },

    /// Show what the host reports for a path
    Read {
        /// Absolute path on the host
        path: String,
        /// Print the resource as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-materialize a file if its path or source changed
    Update {
        /// Absolute path on the host
        path: String,
        /// URL or host-local path
        source: String,
        /// Path the file was previously applied at
        #[arg(long)]
        previous_path: Option<String>,
        /// Source the file was previously applied from
        #[arg(long)]
        previous_source: Option<String>,
    },

    /// Delete a file and every sibling sharing its base name
    Delete {
        /// Absolute path on the host
        path: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct RenderArgs {
    /// Template name (CreateOrUpdateFile, GetFile, DeleteFile)
    pub template: String,

    /// Value for the path argument
    #[arg(long)]
    pub path: String,

    /// Value for the source argument (CreateOrUpdateFile only)
    #[arg(long)]
    pub source: Option<String>,
}
