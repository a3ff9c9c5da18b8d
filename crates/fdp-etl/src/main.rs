//! fdp-etl - Football data pipeline runner

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use sqlx::Acquire;
use tracing::info;

use fdp_common::logging::{init_logging, LogConfig, LogLevel};
use fdp_etl::config::{FixturesConfig, FootballDataConfig};
use fdp_etl::datasets::{fixtures_api, football_data};
use fdp_etl::load::PgSink;

#[derive(Parser, Debug)]
#[command(name = "fdp-etl")]
#[command(author, version, about = "Football data ETL runner")]
struct Cli {
    /// Dataset to process
    #[command(subcommand)]
    dataset: Dataset,

    /// Directory for cached raw payloads
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Dataset {
    /// football-data.co.uk seasonal CSV files
    FootballData {
        /// Dataset configuration file
        #[arg(short, long, default_value = "./config/football_data.yaml")]
        config: PathBuf,

        /// First day of the season window (YYYY-MM-DD)
        #[arg(long, default_value = "2000-07-01")]
        from: NaiveDate,
    },

    /// Fixtures API schedule and per-fixture statistics
    Fixtures {
        /// Dataset configuration file
        #[arg(short, long, default_value = "./config/fixtures.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("fdp-etl".to_string())
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("failed to connect to database")?;

    let client = reqwest::Client::new();
    let today = Local::now().date_naive();

    // One run, one transaction; a fatal error rolls everything back
    let mut tx = pool.begin().await?;
    let summary = match cli.dataset {
        Dataset::FootballData { config, from } => {
            info!("Processing football-data.co.uk seasonal dataset");
            let config = FootballDataConfig::from_path(&config)
                .with_context(|| format!("failed to load {}", config.display()))?;
            let mut sink = PgSink::new(tx.acquire().await?);
            football_data::run(&config, &cli.data_dir, from, today, &client, &mut sink).await?
        },
        Dataset::Fixtures { config } => {
            info!("Processing fixtures API dataset");
            let config = FixturesConfig::from_path(&config)
                .with_context(|| format!("failed to load {}", config.display()))?;
            let mut sink = PgSink::new(tx.acquire().await?);
            fixtures_api::run(&config, &cli.data_dir, today, &client, &mut sink).await?
        },
    };
    tx.commit().await?;

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        rows = summary.rows_loaded,
        "Run complete"
    );
    Ok(())
}
