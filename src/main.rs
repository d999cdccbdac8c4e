//! catalog-crawler - Session-authenticated product catalog crawler
//!
//! Drives a WebDriver browser through login, category filters, and pagination.

use anyhow::{Context, Result};
use catalog_crawler::browser::WebDriverPage;
use catalog_crawler::config::{Config, Credentials, OutputFormat};
use catalog_crawler::crawler::Crawler;
use catalog_crawler::format::Formatter;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "catalog-crawler",
    version,
    about = "Session-authenticated product catalog crawler",
    long_about = "Logs into a distributor catalog through WebDriver, walks every category \
                  filter, and exports the product listings."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (json, csv, table)
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and crawl every category
    #[command(alias = "c")]
    Crawl {
        /// Write records to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// WebDriver endpoint
        #[arg(long, env = "CATALOG_WEBDRIVER_URL")]
        webdriver: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Stop each category after this many pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Drop products already seen in an earlier category
        #[arg(long)]
        dedupe: bool,

        /// Delay after clicks in milliseconds
        #[arg(long, env = "CATALOG_DELAY")]
        delay: Option<u64>,
    },

    /// Print the effective selector configuration
    Selectors,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    dotenvy::dotenv().ok();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    if let Some(format) = cli.format {
        config.format = format;
    }

    match cli.command {
        Commands::Crawl { output, webdriver, headed, max_pages, dedupe, delay } => {
            if let Some(url) = webdriver {
                config.webdriver_url = url;
            }
            if headed {
                config.headless = false;
            }
            if max_pages.is_some() {
                config.max_pages = max_pages;
            }
            if dedupe {
                config.dedupe = true;
            }
            if let Some(d) = delay {
                config.delay_ms = d;
            }

            let credentials = Credentials::from_env();
            credentials.validate()?;

            let format = config.format;
            let crawler = Crawler::new(config)?;
            let page = WebDriverPage::connect(crawler.config()).await?;
            let report = crawler.run(&credentials, page).await?;

            let rendered = Formatter::new(format).format_records(&report.records);

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} records to {}", report.records.len(), path.display());
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Selectors => {
            let rendered = toml::to_string_pretty(&config.selectors)
                .context("Failed to serialize selectors")?;
            println!("{}", rendered);
        }
    }

    Ok(())
}
