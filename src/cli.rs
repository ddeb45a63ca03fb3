use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use reconcile::DistPolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "distenv")]
#[command(version)]
#[command(about = "Declarative LuaDist environments", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install missing packages into an environment
    Apply(ApplyArgs),

    /// Show what apply would do without installing anything
    Plan(TargetArgs),

    /// List packages installed in an environment
    Status(StatusArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// What to reconcile: shared by `apply` and `plan`
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Environment directory (absolute)
    #[arg(long, env = "DISTENV_PATH")]
    pub path: Option<PathBuf>,

    /// Package to install (repeatable)
    #[arg(short, long = "package", value_name = "NAME")]
    pub packages: Vec<String>,

    /// Which dist types may be installed: all, source or binary
    #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
    pub allow_dists: Option<DistPolicy>,

    /// Repository to install dists from
    #[arg(long, value_name = "URL")]
    pub repo: Option<String>,

    /// Read the request from a JSON or TOML file
    #[arg(long, value_name = "FILE")]
    pub request: Option<PathBuf>,

    /// Emit the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Number of parallel installs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-package install timeout in seconds (0 disables it)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts per install on network errors
    #[arg(long)]
    pub retries: Option<u32>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Preview changes without installing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Environment directory
    #[arg(long, env = "DISTENV_PATH")]
    pub path: PathBuf,

    /// Emit the package list as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_policy(s: &str) -> Result<DistPolicy, String> {
    s.parse().map_err(|e: reconcile::Error| e.to_string())
}
