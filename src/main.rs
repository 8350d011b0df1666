//! Command-line entry point for the dropsieve pipeline.

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use dropsieve::config::ValidatorConfig;
use dropsieve::extract::{extract_candidates, read_candidates, read_replies, write_candidates};
use dropsieve::probe::{AlchemyTransfers, ValidationScheduler};
use dropsieve::report;
use dropsieve::types::CandidateEntry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "dropsieve", version, about = "Giveaway reply filter and funding validator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract unique wallet addresses from a reply export
    Extract {
        /// Path to the reply export CSV
        input: PathBuf,
        /// Output path (default: <input>_filtered.csv)
        output: Option<PathBuf>,
    },
    /// Check candidate addresses for on-chain funding
    Validate {
        /// Path to a candidate CSV produced by `extract`
        input: PathBuf,
        /// Funded output path (default: <input>_funded.csv)
        output: Option<PathBuf>,
        #[command(flatten)]
        opts: ValidatorOpts,
    },
    /// Extract then validate in one pass
    Run {
        /// Path to the reply export CSV
        input: PathBuf,
        #[command(flatten)]
        opts: ValidatorOpts,
    },
}

#[derive(Args, Debug)]
struct ValidatorOpts {
    /// Alchemy network slug (e.g. arb-mainnet, eth-mainnet, base-mainnet)
    #[arg(long, default_value = "arb-mainnet")]
    network: String,

    /// Alchemy API key; prefer the environment or .env over the flag
    #[arg(long, env = "ALCHEMY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Concurrent probe workers
    #[arg(long, default_value_t = 20)]
    concurrency: usize,

    /// Global request ceiling per second
    #[arg(long, default_value_t = 25)]
    rate_limit: u32,

    /// Retry attempts per address after the first try
    #[arg(long, default_value_t = 3)]
    retries: usize,
}

impl ValidatorOpts {
    fn into_config(self) -> ValidatorConfig {
        ValidatorConfig {
            network: self.network,
            api_key: self.api_key.unwrap_or_default(),
            concurrency: self.concurrency,
            rate_limit_per_second: self.rate_limit,
            retry_attempts: self.retries,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { input, output } => {
            let output = output.unwrap_or_else(|| derive_output(&input, "_filtered"));
            cmd_extract(&input, &output)?;
        }
        Commands::Validate {
            input,
            output,
            opts,
        } => {
            let output = output.unwrap_or_else(|| derive_output(&input, "_funded"));
            let candidates = read_candidates(&input)?;
            cmd_validate(candidates, &input, &output, opts.into_config()).await?;
        }
        Commands::Run { input, opts } => {
            let filtered = derive_output(&input, "_filtered");
            let candidates = cmd_extract(&input, &filtered)?;
            if candidates.is_empty() {
                return Ok(());
            }
            let funded_out = derive_output(&input, "_funded");
            cmd_validate(candidates, &input, &funded_out, opts.into_config()).await?;
        }
    }

    Ok(())
}

/// Extraction stage: reply export in, deduplicated candidate CSV out.
fn cmd_extract(input: &Path, output: &Path) -> Result<Vec<CandidateEntry>> {
    let rows = read_replies(input)?;
    let (entries, summary) = extract_candidates(&rows);

    if entries.is_empty() {
        warn!("No wallet addresses found in {}", input.display());
        return Ok(entries);
    }

    write_candidates(output, &entries)?;
    info!(
        "Extraction done: {} unique addresses, {} duplicates skipped, {} rows without an address",
        summary.unique, summary.duplicates, summary.unmatched
    );
    Ok(entries)
}

/// Validation stage: probe every candidate, write the partition, print the
/// summary.
async fn cmd_validate(
    candidates: Vec<CandidateEntry>,
    input: &Path,
    funded_out: &Path,
    config: ValidatorConfig,
) -> Result<()> {
    if candidates.is_empty() {
        return Err(anyhow!("no candidates to validate in {}", input.display()));
    }
    config.validate()?;

    let source = Arc::new(AlchemyTransfers::new(&config)?);
    let scheduler = ValidationScheduler::from_config(&config, source);
    let cancel = spawn_interrupt_watcher();

    let run = scheduler.run(candidates, cancel).await;

    report::write_funded(funded_out, &run.funded)?;
    report::write_unfunded(&derive_output(input, "_unfunded"), &run.unfunded)?;
    report::log_failures(&run.failed);

    println!("{}", report::render_summary(&run.summary));
    Ok(())
}

/// Flip the cancellation flag on Ctrl-C; in-flight results are kept.
fn spawn_interrupt_watcher() -> watch::Receiver<bool> {
    let (cancel_sender, cancel_receiver) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping workers and keeping completed results");
                let _ = cancel_sender.send(true);
            }
            Err(e) => {
                error!("Failed to listen for interrupt: {}", e);
                // Keep the sender alive so workers never see a closed channel
                std::future::pending::<()>().await;
            }
        }
    });

    cancel_receiver
}

/// `<stem><suffix>.csv` next to the input, like `replies_funded.csv`.
fn derive_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.csv", stem, suffix))
}
