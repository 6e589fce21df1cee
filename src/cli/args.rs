use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HA-EVAL: High-Availability Evaluation Suite
///
/// Runs background S3 workloads against a storage cluster while faults are
/// injected, and classifies every operation against the fault window.
#[derive(Parser, Debug)]
#[command(name = "ha-eval")]
#[command(version = "0.1.0")]
#[command(about = "Validate storage-cluster availability under injected faults")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an evaluation suite from a config file
    Run(RunArgs),

    /// Run a single ad-hoc workload without fault injection
    Drive(DriveArgs),

    /// Generate a sample suite config file
    Init(InitArgs),

    /// Delete leftover test buckets from a previous run
    Cleanup(CleanupArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the suite config file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run only the scenario with this id
    #[arg(long)]
    pub scenario: Option<String>,

    /// Dry run - print the plan without touching the cluster
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct DriveArgs {
    /// Path to the suite config file (YAML); only the endpoint section is used
    #[arg(short, long)]
    pub config: PathBuf,

    /// Bucket to drive load against
    #[arg(short, long)]
    pub bucket: String,

    /// Worker tasks to spawn
    #[arg(long, default_value = "4")]
    pub workers: usize,

    /// Iterations per worker
    #[arg(long, default_value = "100")]
    pub iterations: u32,

    /// Object size in bytes
    #[arg(long, default_value = "4096")]
    pub object_size: usize,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output path for the config file
    #[arg(short, long, default_value = "ha-eval.yaml")]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CleanupArgs {
    /// Path to the suite config file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Bucket name prefix to delete (empty objects first)
    #[arg(long, default_value = "ha-eval")]
    pub prefix: String,

    /// Force cleanup without confirmation
    #[arg(short, long)]
    pub force: bool,
}
