use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use newsharvest::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "newsharvest",
    version,
    about = "Multi-site financial news crawler",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages and articles for one or more sites
    Crawl {
        /// Site id to crawl (repeatable); all registered sites when omitted
        #[arg(short, long = "site")]
        sites: Vec<String>,

        /// Output directory for <site>.jsonl files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Last listing page for counter-paginated sites
        #[arg(long)]
        max_page: Option<u32>,
    },

    /// List registered sites
    Sites,

    /// Fetch and extract a single article
    Extract {
        /// Article URL
        url: String,

        /// Classifier endpoint to send the article text to
        #[arg(long)]
        classify_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "newsharvest starting");

    match cli.command {
        Commands::Crawl {
            sites,
            output,
            max_page,
        } => {
            if let Some(output) = output {
                config.output.dir = output;
            }
            config.validate().context("Invalid configuration")?;

            tracing::info!(
                sites = ?sites,
                output = %config.output.dir.display(),
                max_page = ?max_page,
                "Starting crawl command"
            );
            commands::crawl(config, sites, max_page).await?;
        }

        Commands::Sites => {
            config.validate().context("Invalid configuration")?;
            commands::sites(&config)?;
        }

        Commands::Extract { url, classify_url } => {
            if let Some(endpoint) = classify_url {
                config.classifier.endpoint = Some(endpoint);
            }
            config.validate().context("Invalid configuration")?;

            tracing::info!(url = %url, "Starting extract command");
            commands::extract(&config, &url).await?;
        }
    }

    tracing::info!("newsharvest completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "newsharvest=debug,info".to_string()
    } else {
        format!("newsharvest={level},warn")
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to initialize logging")?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to initialize logging")?;
        }
    }

    Ok(())
}
