use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use yooz_bridge::config::AppConfig;
use yooz_bridge::handlers::{run_export, run_import};
use yooz_bridge::services::erp::EpicorClient;
use yooz_bridge::utils::sanitize_for_log;

#[derive(Parser)]
#[command(
    name = "yooz-bridge",
    author,
    version,
    about = "Exchange AP master data and invoices between Epicor and Yooz."
)]
struct Cli {
    /// Load environment variables from this file before reading configuration.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Export chart of accounts, vendors, purchase orders and payments to Yooz.
    Export,
    /// Import Yooz invoice files into an Epicor AP invoice group.
    Import,
}

impl Command {
    fn name(self) -> &'static str {
        match self {
            Command::Export => "export",
            Command::Import => "import",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path).with_context(|| format!("failed to load {}", path.display()))?;
    }

    // Override with RUST_LOG for REST call detail (yooz_bridge=debug)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "yooz_bridge=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", id = %run_id, direction = cli.command.name());

    if let Err(e) = run(cli.command).instrument(span).await {
        tracing::error!(run_id = %run_id, "Run failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command) -> Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let client = EpicorClient::new(config.epicor.clone()).context("failed to create Epicor client")?;

    tracing::info!("Starting {} for company {}", command.name(), client.company());

    match command {
        Command::Export => {
            let summary = run_export(&config, &client).await?;
            for outcome in &summary.outcomes {
                tracing::info!(
                    "{}: {} record(s){}",
                    outcome.kind,
                    outcome.rows,
                    if outcome.file.is_none() { ", no file written" } else { "" }
                );
            }
        }
        Command::Import => {
            let summary = run_import(&config, &client).await?;
            for item in &summary.errors {
                tracing::warn!(
                    "{} {}: {}",
                    item.file,
                    item.invoice_num.as_deref().map(sanitize_for_log).unwrap_or_else(|| "(file)".to_string()),
                    item.error_message
                );
            }
        }
    }

    tracing::info!("Finished");
    Ok(())
}
