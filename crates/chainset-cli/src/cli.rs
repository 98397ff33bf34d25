use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chainset",
    about = "Differences between keyed snapshots, and their composition",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with comparer settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Field of each record that holds its key
    #[arg(long, global = true, default_value = "id")]
    pub key: String,

    /// Entries pulled from each source per batch (overrides the config file)
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Skip input consistency checks (overrides the config file)
    #[arg(long, global = true)]
    pub skip_validation: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the difference between two snapshots
    Diff(DiffArgs),
    /// Show the key-only plan for the difference between two snapshots
    Plan(PairArgs),
    /// Combine diff(S, S1) and diff(S, S2) into diff(S1, S2)
    Progress(ProgressArgs),
    /// Collapse a chain of consecutive differences into one
    Squash(SquashArgs),
    /// Apply a difference to a snapshot
    Apply(ApplyArgs),
    /// Generate a random snapshot
    Generate(GenerateArgs),
}

#[derive(Args)]
pub struct PairArgs {
    pub before: PathBuf,
    pub after: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub snapshots: PairArgs,
    /// Plan by key, then stream both snapshots in pages
    #[arg(long)]
    pub planned: bool,
}

#[derive(Args)]
pub struct ProgressArgs {
    pub first: PathBuf,
    pub second: PathBuf,
}

#[derive(Args)]
pub struct SquashArgs {
    /// Differences, oldest first
    #[arg(required = true)]
    pub differences: Vec<PathBuf>,
}

#[derive(Args)]
pub struct ApplyArgs {
    pub snapshot: PathBuf,
    pub difference: PathBuf,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[arg(long)]
    pub entries: usize,
    #[arg(long)]
    pub ids: usize,
    #[arg(long)]
    pub templates: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
}
