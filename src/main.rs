//! Sitesweep main entry point
//!
//! This is the command-line interface for the Sitesweep site harvester.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sitesweep::config::{load_config_with_hash, validate, Config};
use sitesweep::jobs::{JobId, JobRunner};
use sitesweep::output::{load_statistics, parse_run_date, print_statistics, ArtifactWriter};
use sitesweep::storage::{open_progress_store, ProgressSnapshot, ProgressStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Sitesweep: discover every page of a website and summarize it
///
/// A crawl first discovers all pages reachable on the seed's host, then
/// extracts a short summary of each page into per-host JSON files. Pages
/// whose content has not changed since the previous run are skipped.
#[derive(Parser, Debug)]
#[command(name = "sitesweep")]
#[command(version)]
#[command(about = "Domain-bounded site discovery and extraction", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one or more sites; Ctrl-C stops all running jobs
    Crawl {
        /// Seed URLs, one job each
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Job id to use (only with a single URL)
        #[arg(long, value_name = "ID")]
        job_id: Option<JobId>,
    },

    /// Show the latest progress record of a job
    Progress {
        #[arg(value_name = "JOB")]
        job_id: JobId,
    },

    /// List every job with its status
    Activity,

    /// Show aggregated job statistics
    Stats,

    /// Delete a job's progress record
    Delete {
        #[arg(value_name = "JOB")]
        job_id: JobId,
    },

    /// List run dates that produced output, newest first
    Runs,

    /// List the artifacts of one run date (YYYY-MM-DD), or print one of them
    Output {
        #[arg(value_name = "DATE")]
        date: String,

        /// Artifact to print, as listed (e.g. example.com.json)
        #[arg(value_name = "FILE")]
        file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_ref())?;

    match cli.command {
        Command::Crawl { urls, job_id } => handle_crawl(&config, urls, job_id).await,
        Command::Progress { job_id } => handle_progress(&config, &job_id),
        Command::Activity => handle_activity(&config),
        Command::Stats => handle_stats(&config),
        Command::Delete { job_id } => handle_delete(&config, &job_id),
        Command::Runs => handle_runs(&config),
        Command::Output { date, file } => handle_output(&config, &date, file.as_deref()),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitesweep=info,warn"),
            1 => EnvFilter::new("sitesweep=debug,info"),
            2 => EnvFilter::new("sitesweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            let config = Config::default();
            validate(&config)?;
            tracing::debug!("Using built-in configuration");
            Ok(config)
        }
    }
}

fn progress_store(config: &Config) -> anyhow::Result<Arc<dyn ProgressStore>> {
    open_progress_store(&config.output)
        .with_context(|| format!("cannot open progress dir {}", config.output.progress_dir))
}

/// Handles `crawl`: runs every job to a terminal state
async fn handle_crawl(
    config: &Config,
    urls: Vec<String>,
    job_id: Option<JobId>,
) -> anyhow::Result<()> {
    if job_id.is_some() && urls.len() > 1 {
        bail!("--job-id can only be used with a single URL");
    }

    let runner = JobRunner::from_config(config)?;

    let mut ids = Vec::with_capacity(urls.len());
    for url in &urls {
        let id = runner
            .submit(url, job_id.clone())
            .await
            .with_context(|| format!("cannot start crawl of {}", url))?;
        println!("Started job {} for {}", id, url);
        ids.push(id);
    }

    let wait_all = async {
        let mut finished = Vec::with_capacity(ids.len());
        for id in &ids {
            finished.push((id.clone(), runner.wait(id).await));
        }
        finished
    };

    let finished = tokio::select! {
        finished = wait_all => finished,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping all jobs");
            runner.stop_all().await;
            let mut finished = Vec::with_capacity(ids.len());
            for id in &ids {
                finished.push((id.clone(), runner.wait(id).await));
            }
            finished
        }
    };

    let mut failures = 0;
    for (id, result) in finished {
        match result {
            Ok(snapshot) => {
                print_snapshot_line(id.as_str(), &snapshot);
                if snapshot.error.is_some() {
                    failures += 1;
                }
            }
            Err(e) => {
                println!("{}  {}", id, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} jobs failed", failures, ids.len());
    }
    Ok(())
}

fn handle_progress(config: &Config, job_id: &JobId) -> anyhow::Result<()> {
    let store = progress_store(config)?;
    match store.read(job_id.as_str())? {
        Some(snapshot) => {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        None => bail!("no progress record for job {}", job_id),
    }
}

fn handle_activity(config: &Config) -> anyhow::Result<()> {
    let store = progress_store(config)?;
    let records = store.list()?;

    if records.is_empty() {
        println!("No jobs recorded.");
        return Ok(());
    }

    for (job_id, snapshot) in &records {
        print_snapshot_line(job_id, snapshot);
    }
    Ok(())
}

/// Handles `stats`: aggregates every progress record
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = progress_store(config)?;
    println!("Progress records: {}\n", config.output.progress_dir);

    let stats = load_statistics(store.as_ref())?;
    print_statistics(&stats);
    Ok(())
}

fn handle_delete(config: &Config, job_id: &JobId) -> anyhow::Result<()> {
    let store = progress_store(config)?;

    if let Some(snapshot) = store.read(job_id.as_str())? {
        if snapshot.status.is_active() {
            tracing::warn!(
                "Job {} is {}; its writer may recreate the record",
                job_id,
                snapshot.status
            );
        }
    }

    if store.delete(job_id.as_str())? {
        println!("Deleted job {}", job_id);
        Ok(())
    } else {
        bail!("no progress record for job {}", job_id)
    }
}

fn handle_runs(config: &Config) -> anyhow::Result<()> {
    let writer = ArtifactWriter::new(&config.output.output_dir);
    let runs = writer.list_runs()?;

    if runs.is_empty() {
        println!("No runs in {}.", config.output.output_dir);
    }
    for date in runs {
        println!("{}", date.format("%Y-%m-%d"));
    }
    Ok(())
}

fn handle_output(config: &Config, date: &str, file: Option<&str>) -> anyhow::Result<()> {
    let Some(date) = parse_run_date(date) else {
        bail!("invalid date {:?}, expected YYYY-MM-DD", date);
    };

    let writer = ArtifactWriter::new(&config.output.output_dir);
    if let Some(name) = file {
        let pages = writer
            .read_entry(date, name)
            .with_context(|| format!("cannot read artifact {}", name))?;
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }

    let run_dir = writer.run_dir(date);
    for name in writer.list_run_entries(date)? {
        println!("{}", run_dir.join(name).display());
    }
    Ok(())
}

fn print_snapshot_line(job_id: &str, snapshot: &ProgressSnapshot) {
    let c = &snapshot.counters;
    print!(
        "{}  {:>3}%  {:<14}  done {}/{}  ok {}  failed {}  unchanged {}  {}",
        job_id,
        snapshot.progress,
        snapshot.status.as_status(),
        c.done,
        c.total,
        c.success,
        c.failed,
        c.skipped,
        snapshot.url
    );
    match &snapshot.error {
        Some(error) => println!("  ({})", error),
        None => println!(),
    }
}
