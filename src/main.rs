use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use gleaner::config::Config;
use gleaner::ingest::{http_client, run_batch};
use gleaner::storage::Database;

#[derive(Parser, Debug)]
#[command(
    name = "gleaner",
    about = "Selector-driven feed ingester with Open Graph preview enrichment"
)]
struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "FILE", default_value = "gleaner.toml")]
    config: PathBuf,

    /// Database file (overrides the config file's database_path)
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    /// Suppress the per-feed JSON reports on stdout
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the per-feed reports
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let db_path = match &args.database {
        Some(path) => path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?
            .to_string(),
        None => config.database_path.clone(),
    };

    if args.reset_db && std::path::Path::new(&db_path).exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    if config.feeds.is_empty() {
        eprintln!("Warning: no feeds configured in {}", args.config.display());
    }

    let db = Database::open(&db_path)
        .await
        .context("Failed to open database")?;
    let client = http_client(config.fetch_timeout()).context("Failed to create HTTP client")?;

    let quiet = args.quiet;
    let summary = run_batch(&db, &client, &config, |report| {
        if quiet {
            return;
        }
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!(feed = %report.url, error = %e, "Failed to serialize report"),
        }
    })
    .await;

    println!(
        "Ingested {} new entries: {} feeds succeeded, {} failed",
        summary.inserted, summary.succeeded, summary.failed
    );

    Ok(())
}
