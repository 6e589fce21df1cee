use anyhow::{bail, Result};
use clap::Parser;
use ha_eval::cli::{self, Args, Command, SuiteConfig};
use ha_eval::storage::{ClientError, S3Client, StorageClient};
use ha_eval::suite::{self, SuiteRunner};
use ha_eval::workload::{
    CancelToken, ClassifyPolicy, FaultWindow, WorkerConfig, WorkerPool, WorkloadKind,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match args.command {
        Command::Run(run_args) => {
            run_suite(run_args).await?;
        }
        Command::Drive(drive_args) => {
            drive_workload(drive_args).await?;
        }
        Command::Init(init_args) => {
            generate_sample_config(init_args)?;
        }
        Command::Cleanup(cleanup_args) => {
            cleanup_buckets(cleanup_args).await?;
        }
    }

    Ok(())
}

async fn run_suite(args: cli::RunArgs) -> Result<()> {
    info!("Loading suite config from {:?}", args.config);

    let config = SuiteConfig::load(&args.config)?;

    if args.dry_run {
        println!("Dry run mode - no workload will be issued");
        println!("\nConfiguration:");
        println!("  Name: {}", config.name);
        println!(
            "  Endpoint: {}",
            config.endpoint.url.as_deref().unwrap_or("(ambient)")
        );
        println!("  Scenarios: {}", config.scenarios.len());
        println!("\nScenarios:");
        for scenario in &config.scenarios {
            println!(
                "  - {}: {} workers, fault: {:?}",
                scenario.id,
                scenario.workload.workers(),
                scenario.fault
            );
        }
        return Ok(());
    }

    let output_dir = args
        .output
        .unwrap_or_else(|| config.settings.output_dir.clone());

    let runner = SuiteRunner::new(config);
    let results = runner.run(args.scenario.as_deref()).await?;

    print_results(&results);

    runner.save_results(&output_dir).await?;
    println!("\nResults saved to: {:?}", output_dir);

    if !results.passed() {
        bail!(
            "suite failed: {} failed, {} errors",
            results.summary.failed,
            results.summary.errors
        );
    }

    Ok(())
}

fn print_results(results: &suite::SuiteResults) {
    println!("\n{}", "=".repeat(60));
    println!("SUITE COMPLETE");
    println!("{}", "=".repeat(60));
    println!("\nSummary:");
    println!("  Scenarios: {}", results.summary.total_scenarios);
    println!("  Passed: {}", results.summary.passed);
    println!("  Failed: {}", results.summary.failed);
    println!("  Errors: {}", results.summary.errors);
    println!("  Total operations: {}", results.summary.total_operations);
    println!(
        "  Failures outside window: {}",
        results.summary.clear_failures
    );

    println!("\nScenarios:");
    for scenario in &results.scenarios {
        println!(
            "  {:?} {} (fault: {}, {} ops)",
            scenario.verdict,
            scenario.scenario_id,
            scenario.fault,
            scenario.totals.total()
        );
    }
}

/// Ad-hoc bounded workload against one bucket, no fault injection. Useful
/// for checking endpoint credentials and baseline behavior before a suite.
async fn drive_workload(args: cli::DriveArgs) -> Result<()> {
    let config = SuiteConfig::load(&args.config)?;
    let client: Arc<dyn StorageClient> = Arc::new(S3Client::new(&config.endpoint)?);

    match client.create_bucket(&args.bucket).await {
        Ok(()) | Err(ClientError::AlreadyExists(_)) => {}
        Err(e) => bail!("failed to prepare bucket {}: {}", args.bucket, e),
    }

    let cfg = WorkerConfig {
        iterations: Some(args.iterations),
        kind: WorkloadKind::Mixed,
        bucket: args.bucket.clone(),
        key_prefix: "drive".to_string(),
        object_size: args.object_size,
        policy: ClassifyPolicy::TouchedAtAll,
    };

    info!(
        "Driving {} iterations x {} workers against {}",
        args.iterations, args.workers, args.bucket
    );

    let window = FaultWindow::new();
    let cancel = CancelToken::new();
    let pool = WorkerPool::spawn(client, &window, &cancel, &cfg, args.workers);

    let handoff = Duration::from_secs(config.settings.handoff_timeout_secs);
    let results = pool.collect(handoff).await?;

    println!("\nOperations: {}", results.merged.total());
    println!("  Succeeded: {}", results.merged.ok_clear.len());
    println!("  Failed: {}", results.merged.clear_failures().len());

    for record in results.merged.clear_failures() {
        println!("  {} {}: {:?}", record.op, record.target, record.outcome);
    }

    if !results.merged.clear_failures().is_empty() {
        bail!("{} operations failed", results.merged.clear_failures().len());
    }

    Ok(())
}

fn generate_sample_config(args: cli::InitArgs) -> Result<()> {
    let config = SuiteConfig::sample();

    config.save(&args.output)?;
    println!("Generated sample config at: {:?}", args.output);

    Ok(())
}

async fn cleanup_buckets(args: cli::CleanupArgs) -> Result<()> {
    let config = SuiteConfig::load(&args.config)?;

    if !args.force {
        println!(
            "This deletes every bucket starting with '{}' (use --force to proceed)",
            args.prefix
        );
        return Ok(());
    }

    let client = S3Client::new(&config.endpoint)?;
    let removed = suite::cleanup_buckets(&client, &args.prefix).await?;

    println!("Deleted {} buckets", removed);

    Ok(())
}
