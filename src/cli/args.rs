//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// tuxcache - build-result cache for ClangBuiltLinux CI
///
/// Decides whether a workflow's Tuxsuite builds need to run and records
/// their outcome afterwards.
#[derive(Parser, Debug)]
#[command(name = "tuxcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TUXCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pre-flight check: exit 0 to skip the builds, 1 to run them
    Check(CheckArgs),

    /// Record the outcome of a finished Tuxsuite batch
    Update(UpdateArgs),

    /// Show the cache entry of a workflow
    Show(ShowArgs),

    /// Print the cache key of a workflow name
    Key(KeyArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Token allowed to read and write repository variables
    #[arg(short = 'g', long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Workflow display name, e.g. "mainline (clang-19)"
    #[arg(short, long, required_unless_present = "purge_cache")]
    pub workflow_name: Option<String>,

    /// URL of the tree's git repository
    #[arg(short = 'o', long, required_unless_present = "purge_cache")]
    pub git_repo: Option<String>,

    /// Branch or tag to build
    #[arg(short = 'r', long, required_unless_present = "purge_cache")]
    pub git_ref: Option<String>,

    /// Delete every cache entry, then exit 1
    #[arg(long)]
    pub purge_cache: bool,
}

/// Arguments for the update command
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Workflow display name
    #[arg(short, long, env = "GITHUB_WORKFLOW")]
    pub workflow_name: String,

    /// Token allowed to write repository variables
    #[arg(short, long, env = "REPO_SCOPED_PAT", hide_env_values = true)]
    pub token: String,

    /// Read the mock batch file instead of the real one (also enabled when
    /// MOCK is set to any value)
    #[arg(long)]
    pub mock: bool,

    /// Batch file to read (overrides configuration and --mock)
    #[arg(long)]
    pub builds_file: Option<PathBuf>,

    /// Let a passing batch replace a stored failure
    #[arg(long)]
    pub allow_fail_to_pass: bool,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Token allowed to read repository variables
    #[arg(short = 'g', long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Workflow display name
    #[arg(short, long)]
    pub workflow_name: String,
}

/// Arguments for the key command
#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Workflow display name
    pub workflow_name: String,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
