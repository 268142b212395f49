use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use url::Url;

mod browser;
mod config;
mod crawler;
mod downloaders;
mod error;
mod extractors;
mod models;
mod scroll;
mod snapshot;
mod storage;
mod traits;
mod utils;

#[cfg(test)]
mod testing;

use browser::ChromeDriver;
use config::Config;
use crawler::IssueCrawler;
use models::{IssueReport, ScrollOutcome};

#[derive(Parser)]
#[command(name = "comicsaver")]
#[command(about = "Download every page of a comic issue or a whole series")]
#[command(version)]
struct Cli {
    /// URL of the comic or issue
    url: String,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Number of download workers
    #[arg(short, long)]
    threads: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "comicsaver.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(threads) = self.threads {
            config.concurrency = threads.max(1);
        }
        if self.headless {
            config.browser.headless = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {:?}", cli.config))?;
    cli.apply(&mut config);

    let target = Url::parse(&cli.url).with_context(|| format!("invalid URL: {}", cli.url))?;
    let host = target.host_str().unwrap_or_default();
    if !host.contains(&config.site.expected_host) {
        warn!("URL might not be from {}", config.site.expected_host);
    }

    info!("Setting up browser...");
    let driver = ChromeDriver::launch(&config.browser).context("browser could not be started")?;

    let result = match IssueCrawler::new(&driver, &config) {
        Ok(crawler) => crawler.run(&target).await,
        Err(e) => Err(e),
    };
    driver.close();

    match result {
        Ok(reports) => {
            log_summary(&reports);
            Ok(())
        }
        Err(e) => {
            error!("An error occurred: {}", e);
            Err(e.into())
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!("comicsaver={}", level))
        .with_target(false)
        .init();

    Ok(())
}

fn log_summary(reports: &[IssueReport]) {
    let downloaded: usize = reports.iter().map(|r| r.downloaded).sum();
    let skipped: usize = reports.iter().map(|r| r.skipped).sum();
    let failed: usize = reports.iter().map(|r| r.failed).sum();
    let empty = reports.iter().filter(|r| r.images_found == 0).count();
    let unsettled = reports
        .iter()
        .filter(|r| matches!(r.scroll, Some(ScrollOutcome::BoundReached { .. })))
        .count();

    info!("📊 Crawl completed:");
    info!("   📚 Issues processed: {}", reports.len());
    info!("   ⬇️ Images downloaded: {}", downloaded);
    info!("   ⏭️ Images skipped: {}", skipped);
    info!("   ❌ Failed downloads: {}", failed);
    if empty > 0 {
        warn!("   ⚠️ Issues without images: {}", empty);
    }
    if unsettled > 0 {
        warn!("   ⚠️ Issues that never stopped growing: {}", unsettled);
    }

    for report in reports.iter().filter(|r| r.failed > 0) {
        warn!(
            "{} failed image(s) in {}, run again to retry",
            report.failed, report.issue_url
        );
    }
}
