//! CLI entry point for the F1 fantasy scorer.
//!
//! Provides subcommands for scoring a round into the league workbook and for
//! inspecting the race results and rosters on their own.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use f1_fantasy::config::Config;
use f1_fantasy::infra::ergast::ErgastClient;
use f1_fantasy::output::{ScoreRecord, append_records, print_json, print_pretty, print_summary};
use f1_fantasy::pipeline::{RunOptions, fetch_results, load_roster, run_round};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "f1_fantasy")]
#[command(about = "Scores an F1 fantasy league round into the league workbook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// JSON config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// League workbook (overrides config)
    #[arg(short, long, value_name = "XLSX")]
    spreadsheet: Option<PathBuf>,

    /// Season year (overrides config)
    #[arg(long)]
    season: Option<u16>,

    /// Results API base URL, e.g. "https://ergast.com/api/f1" (overrides config)
    #[arg(long)]
    api_base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a round's results, score every owner and write the standings
    Score {
        /// Round number within the season
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        round: u32,

        #[command(flatten)]
        config: ConfigArgs,

        /// CSV file to append per-owner scores to
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Compute scores without saving the workbook
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Log the full report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Fetch and list a round's race results
    Results {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        round: u32,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// List the owner rosters from the workbook
    Roster {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

impl ConfigArgs {
    /// Defaults, then the config file, then the environment, then flags.
    fn resolve(self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        let mut config = config.with_env()?;

        if let Some(path) = self.spreadsheet {
            config.spreadsheet_path = path;
        }
        if let Some(season) = self.season {
            config.season = season;
        }
        if let Some(url) = self.api_base_url {
            config.api_base_url = url;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            round,
            config,
            csv,
            dry_run,
            json,
        } => {
            let config = config.resolve()?;
            let api = ErgastClient::from_config(&config)?;

            let report = run_round(&api, &config, round, &RunOptions { dry_run }).await?;

            print_pretty(&report);
            print_summary(&report);
            if json {
                print_json(&report)?;
            }
            if let Some(path) = csv {
                append_records(&path, &ScoreRecord::from_report(&report))
                    .with_context(|| format!("appending scores to {}", path.display()))?;
            }
        }
        Commands::Results { round, config } => {
            let config = config.resolve()?;
            let api = ErgastClient::from_config(&config)?;

            let results = fetch_results(&api, round).await?;
            for (driver, points) in results.ranked() {
                info!(driver, points, "Result");
            }
            info!(
                season = results.season,
                round,
                race = results.race_name.as_deref().unwrap_or("unknown"),
                drivers = results.len(),
                "Results summary"
            );
        }
        Commands::Roster { config } => {
            let config = config.resolve()?;
            let roster = load_roster(&config)?;

            for entry in &roster.owners {
                info!(owner = %entry.owner, drivers = ?entry.drivers, "Roster");
            }
            info!(owners = roster.len(), "Roster summary");
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing() -> WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/f1_fantasy.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("f1_fantasy.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        );

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::builder()
                .with_env_var("RUST_LOG_JSON")
                .with_default_directive(LevelFilter::DEBUG.into())
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}
