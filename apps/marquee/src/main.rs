mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marquee_clickhouse::ClickHouseClient;
use marquee_config::AppConfig;
use marquee_search::{ClickHouseQueryLog, MySqlCatalog, SearchService};
use tracing_subscriber::EnvFilter;

use crate::console::Console;

#[derive(Debug, Parser)]
#[command(name = "marquee", about = "Movie catalog search with a query log")]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Interactive search menu (the default).
    Menu,
    /// Check the query-log store and print a JSON report.
    Doctor,
}

fn build_service(cfg: &AppConfig) -> Result<SearchService> {
    let catalog = MySqlCatalog::connect_lazy(&cfg.mysql)?;
    let log = ClickHouseQueryLog::new(ClickHouseClient::new(cfg.clickhouse.clone())?);
    Ok(SearchService::new(
        Arc::new(catalog),
        Arc::new(log),
        &cfg.search,
    ))
}

async fn run_menu(cfg: &AppConfig) -> Result<()> {
    let service = build_service(cfg)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut console = Console::new(service, stdin.lock(), stdout.lock());
    console.run().await.context("console session failed")
}

async fn run_doctor(cfg: &AppConfig) -> Result<()> {
    let client = ClickHouseClient::new(cfg.clickhouse.clone())?;
    let report = client.doctor_report().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = marquee_config::resolve_config_path(cli.config);
    let cfg = marquee_config::load_config(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    match cli.command.unwrap_or(CliCommand::Menu) {
        CliCommand::Menu => run_menu(&cfg).await,
        CliCommand::Doctor => run_doctor(&cfg).await,
    }
}
