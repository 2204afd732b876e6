//! glucolens CLI
//!
//! Command-line interface for running queries over device data exports:
//! - Run a query against a JSON record file
//! - Summarize a record file
//! - Preview endpoint windows
//! - Generate a default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use glucolens::config::{generate_default_config, Config};
use glucolens::index::DaySet;
use glucolens::query::{compute_windows, QueryExecutor, QuerySpec};
use glucolens::storage::RecordStore;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "glucolens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Windowed queries over diabetes device data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query against a record file
    Query {
        /// JSON array of device records
        #[arg(short, long)]
        data: PathBuf,
        /// JSON query file, or "-" for stdin
        #[arg(short, long)]
        query: String,
        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// Summarize a record file
    Stats {
        /// JSON array of device records
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Show the windows a pair of endpoints produces
    Windows {
        /// Window start (ISO-8601)
        start: String,
        /// Window end (ISO-8601)
        end: String,
        /// Active weekdays, 0 = Sunday (default: all)
        #[arg(short, long, value_delimiter = ',')]
        active_days: Option<Vec<u8>>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config);

    match cli.command {
        Commands::Query { data, query, pretty } => {
            let records = read_records(&data).await?;
            let spec_text = read_input(&query).await?;
            let spec: QuerySpec =
                serde_json::from_str(&spec_text).context("Query is not a valid query object")?;

            let mut executor = QueryExecutor::default().with_defaults(config.query.to_defaults());
            let report = executor.add_data(records);
            tracing::info!("Loaded {:?}: {}", data, report);

            let result = executor.query_data(&spec)?;
            tracing::info!("Query finished in {}ms", result.execution_time_ms);

            if pretty {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", serde_json::to_string(&result)?);
            }
        }

        Commands::Stats { data } => {
            let records = read_records(&data).await?;
            let mut store = RecordStore::new();
            let report = store.add_data(records);
            let stats = store.stats();

            println!("glucolens v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Ingest:");
            println!("  Accepted:   {}", report.accepted);
            println!("  Duplicates: {}", report.duplicates);
            println!("  Malformed:  {}", report.malformed);
            println!();
            println!("Records: {}", stats.records);
            for (event_type, count) in &stats.by_type {
                println!("  {:<14} {}", event_type, count);
            }
            if let Some((first, last)) = &stats.time_bounds {
                println!();
                println!("Span: {} .. {}", first, last);
            }
        }

        Commands::Windows {
            start,
            end,
            active_days,
        } => {
            let days = active_days.map_or_else(DaySet::all, DaySet::from_days);
            let windows = compute_windows(&start, &end, days)?;

            println!(
                "{:<8} {:<26} {:<26} {:>8} {:>8}",
                "WINDOW", "START", "END", "DAYS", "ACTIVE"
            );
            for (name, window) in windows.iter() {
                let [from, to] = window.range_iso();
                println!(
                    "{:<8} {:<26} {:<26} {:>8.2} {:>8.2}",
                    name.as_str(),
                    from,
                    to,
                    window.days_in_range,
                    window.active_days_in_range
                );
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(&path, &config).await?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` overrides the configured level
fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("glucolens={}", config.logging.level).into());

    let (json, pretty) = if config.logging.is_json() {
        (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

async fn read_records(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("{:?} is not a JSON array", path))
}

async fn read_input(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read {}", source))
    }
}
