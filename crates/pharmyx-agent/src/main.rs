//! Pharmyx — drug asset scoring and classification.
//! Entry point for the `pharmyx` binary.

mod config;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pharmyx_common::{DrugRecord, EngineConfig};
use pharmyx_ranker::{score_portfolio, JobOutcome, PortfolioSnapshot, PrecedentJob, PrecedentStore};

use config::{Config, ConfigSource};

#[derive(Parser)]
#[command(name = "pharmyx", version, about = "Score and classify drug assets")]
struct Cli {
    /// Engine tuning from a YAML, JSON or TOML file; replaces the [engine] section
    #[arg(long, global = true, value_name = "PATH")]
    engine: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the indication precedent snapshot from a drug corpus
    Precedents {
        /// JSON array of drug records
        #[arg(long)]
        corpus: PathBuf,
    },
    /// Score every asset in a portfolio snapshot against the published precedents
    Score {
        /// JSON portfolio snapshot: { "drugs": [...], "assets": [...] }
        #[arg(long)]
        portfolio: PathBuf,

        /// Reference date for patent risk (defaults to today, UTC)
        #[arg(long, value_name = "YYYY-MM-DD")]
        as_of: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, source) = Config::load()?;

    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Pharmyx {}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "Configuration loaded"),
        ConfigSource::Defaults(path) => warn!(
            path = %path.display(),
            "Config file not found; using built-in defaults"
        ),
    }

    if let Some(path) = &cli.engine {
        config.engine = EngineConfig::from_file(path)
            .with_context(|| format!("loading engine config {}", path.display()))?;
        info!(path = %path.display(), "Engine config loaded");
    }

    let store = PrecedentStore::open(&config.snapshot.dir)
        .with_context(|| format!("opening snapshot dir {}", config.snapshot.dir.display()))?;

    match cli.command {
        Commands::Precedents { corpus } => rebuild_precedents(&config, &store, &corpus),
        Commands::Score { portfolio, as_of } => {
            let as_of = as_of.unwrap_or_else(|| chrono::Utc::now().date_naive());
            score(&config, &store, &portfolio, as_of)
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn rebuild_precedents(config: &Config, store: &PrecedentStore, corpus: &Path) -> Result<()> {
    let drugs: Vec<DrugRecord> = read_json(corpus)?;
    let job = PrecedentJob::new(store, config.engine.precedent.clone());

    match job.run(&drugs).context("precedent rebuild failed")? {
        JobOutcome::Published { version, indications } => {
            println!("published {version} ({indications} indications)");
        }
        JobOutcome::Unchanged { version } => {
            println!("unchanged {version}");
        }
    }
    Ok(())
}

fn score(config: &Config, store: &PrecedentStore, portfolio: &Path, as_of: NaiveDate) -> Result<()> {
    let precedents = store.load()?.with_context(|| {
        format!(
            "no precedent snapshot in {}; run `pharmyx precedents` first",
            config.snapshot.dir.display()
        )
    })?;
    info!(version = %precedents.version, indications = precedents.precedents.len(), "Precedents loaded");

    let snapshot: PortfolioSnapshot = read_json(portfolio)?;
    let reports = score_portfolio(&snapshot, &precedents, &config.engine, as_of)
        .context("portfolio scoring failed")?;

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
