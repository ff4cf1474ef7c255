use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gdmb_detect::Effort;
use gdmb_sdk::ConfigOverrides;

#[derive(Parser)]
#[command(
    name = "gdmb",
    about = "Find and delete branches whose changes already landed on their targets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show which branches would be deleted and why
    Plan(PlanArgs),
    /// Delete merged branches from a repository snapshot
    Prune(PruneArgs),
    /// Classify one branch against one or more targets
    Check(CheckArgs),
}

#[derive(Args)]
pub struct RepoArgs {
    /// Repository snapshot (JSON)
    #[arg(long)]
    pub repo: PathBuf,
}

#[derive(Args)]
pub struct SelectionArgs {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Required target branch; replaces the configured targets
    #[arg(short = 'b', long = "branch", value_name = "BRANCH")]
    pub required: Vec<String>,

    /// Remote to delete branches on; replaces the configured remotes
    #[arg(short = 'r', long = "remote", value_name = "REMOTE")]
    pub remotes: Vec<String>,

    /// Branch never to delete
    #[arg(short = 'x', long = "exclude", value_name = "BRANCH")]
    pub excluded: Vec<String>,

    /// Only consider branches matching this regular expression
    #[arg(short = 'i', long = "include", value_name = "REGEX")]
    pub include: Vec<String>,

    /// 1: ancestry, 2: also replayed commits, 3: also squash merges
    #[arg(short, long)]
    pub effort: Option<Effort>,

    /// Worker threads for classification
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,
}

impl SelectionArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            effort: self.effort,
            required: self.required.clone(),
            excluded: self.excluded.clone(),
            remotes: self.remotes.clone(),
            include: self.include.clone(),
            parallelism: self.jobs,
        }
    }
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Args)]
pub struct PruneArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Delete without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Print the equivalent git commands instead of deleting
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Branch to classify, `name` or `remote/name`
    pub branch: String,

    /// Target branch, `name` or `remote/name`
    #[arg(short, long = "target", required = true)]
    pub targets: Vec<String>,

    #[arg(short, long, default_value_t = Effort::default())]
    pub effort: Effort,
}
