mod commands;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use qcprice_core::{PlatformId, ProductFilter};
use tracing_subscriber::EnvFilter;

use crate::commands::Output;

#[derive(Debug, Parser)]
#[command(name = "qcprice-cli")]
#[command(about = "Track grocery prices across quick-commerce platforms")]
struct Cli {
    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start tracking the product at URL.
    Add {
        url: String,
        /// Display name; defaults to the scraped product name.
        #[arg(long)]
        name: Option<String>,
        /// Category label; defaults to "general".
        #[arg(long)]
        category: Option<String>,
    },
    /// Scrape one product page without storing anything.
    Scrape { url: String },
    /// Search every platform and show the best match from each.
    Search { query: String },
    /// Compare live and tracked prices for a product name.
    Compare { query: String },
    /// Re-scrape every tracked product once.
    Update,
    /// Show the price history of a tracked product.
    History { id: i64 },
    /// List tracked products, most recently updated first.
    List {
        /// Only products on this platform.
        #[arg(long)]
        platform: Option<PlatformId>,
        /// Only products in this category.
        #[arg(long)]
        category: Option<String>,
    },
    /// Stop tracking a product and drop its history.
    Delete { id: i64 },
}

impl Commands {
    /// `scrape` and `search` only read live pages.
    fn needs_database(&self) -> bool {
        !matches!(self, Self::Scrape { .. } | Self::Search { .. })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = if cli.command.needs_database() {
        qcprice_core::load_app_config()?
    } else {
        qcprice_core::load_offline_app_config()?
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let out = Output { json: cli.json };

    match cli.command {
        Commands::Scrape { url } => commands::run_scrape(&config, &url, out).await,
        Commands::Search { query } => commands::run_search(&config, &query, out).await,
        Commands::Add {
            url,
            name,
            category,
        } => {
            let tracker = connect_tracker(&config).await?;
            commands::run_add(&tracker, &url, name.as_deref(), category.as_deref(), out).await
        }
        Commands::Compare { query } => {
            let tracker = connect_tracker(&config).await?;
            commands::run_compare(&tracker, &query, out).await
        }
        Commands::Update => {
            let tracker = connect_tracker(&config).await?;
            commands::run_update(&tracker, out).await
        }
        Commands::History { id } => {
            let tracker = connect_tracker(&config).await?;
            commands::run_history(&tracker, id, out).await
        }
        Commands::List { platform, category } => {
            let tracker = connect_tracker(&config).await?;
            let filter = ProductFilter { platform, category };
            commands::run_list(&tracker, &filter, out).await
        }
        Commands::Delete { id } => {
            let tracker = connect_tracker(&config).await?;
            commands::run_delete(&tracker, id, out).await
        }
    }
}

/// Connects to Postgres, applies pending migrations, and wires a tracker
/// over the resulting repository.
async fn connect_tracker(
    config: &qcprice_core::AppConfig,
) -> anyhow::Result<qcprice_scraper::PriceTracker> {
    let pool_config = qcprice_db::PoolConfig::from_app_config(config);
    let pool = qcprice_db::connect_pool(&config.database_url, pool_config).await?;
    qcprice_db::run_migrations(&pool).await?;

    let repository = Arc::new(qcprice_db::PgProductRepository::new(pool));
    let tracker = qcprice_scraper::PriceTracker::from_app_config(config, repository)?;
    Ok(tracker)
}
