mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use creatorhub_core::AppConfig;
use creatorhub_search::Aggregator;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "creatorhub-cli")]
#[command(about = "Search creator accounts across platforms")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one aggregated search and print the page as JSON
    Search {
        /// Search keyword; omit to browse all accounts
        #[arg(default_value = "")]
        keyword: String,
        /// Comma-separated platform keys (default: all registered)
        #[arg(long)]
        platforms: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = creatorhub_core::DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },
    /// List registered platforms
    Platforms,
    /// Look up one account by `platform:platform_account_id`
    Account { account_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("creatorhub-cli: pass a subcommand (search, platforms, account); see --help");
        return Ok(());
    };

    let config = creatorhub_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let aggregator = build_aggregator(&config).await?;

    let output = match command {
        Commands::Search {
            keyword,
            platforms,
            page,
            page_size,
        } => {
            commands::run_search(
                &aggregator,
                &keyword,
                platforms.as_deref(),
                page,
                page_size,
            )
            .await?
        }
        Commands::Platforms => commands::run_platforms(&aggregator).await?,
        Commands::Account { account_id } => commands::run_account(&aggregator, &account_id).await?,
    };

    println!("{output}");
    Ok(())
}

async fn build_aggregator(config: &AppConfig) -> anyhow::Result<Aggregator> {
    creatorhub_search::bootstrap::build_aggregator(config)
        .await
        .context("failed to build adapters")
}
