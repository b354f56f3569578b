use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;

use newsharvest::config::Config;
use newsharvest::crawler::{
    run_sites, CrawlOptions, CrawlStats, JobReport, PageFetcher, SiteFetcher, SiteJob,
};
use newsharvest::error::{CrawlerError, Error, NewsharvestErrorTrait};
use newsharvest::site::{SiteAdapterConfig, SiteRegistry};
use newsharvest::storage::JsonLinesStore;
use newsharvest::utils::format_bytes;

pub async fn crawl(config: Config, sites: Vec<String>, max_page: Option<u32>) -> Result<()> {
    let registry = select_sites(&config, &sites, max_page)?;

    println!("Starting news crawl");
    println!("===================");
    println!("Sites: {}", registry.ids().join(", "));
    println!("Output directory: {}", config.output.dir.display());

    // Ctrl-C stops pagination; shutdown mode decides what happens to queued work
    let (abort_tx, abort_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            let _ = abort_tx.send(true);
        }
    });

    let mut jobs = Vec::with_capacity(registry.len());
    for adapter in registry.iter() {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(
            SiteFetcher::from_config(&config.crawler).context("Failed to create fetcher")?,
        );
        let store = JsonLinesStore::open(&config.output.dir, adapter.id())
            .with_context(|| format!("Failed to open output for site `{}`", adapter.id()))?;

        jobs.push(SiteJob {
            adapter: Arc::clone(adapter),
            fetcher,
            store,
        });
    }

    let options = CrawlOptions::from_config(&config.crawler);
    let stats = CrawlStats::new();
    let results = run_sites(jobs, &options, Arc::clone(&stats), abort_rx).await;

    println!("\nCrawl Summary");
    println!("=============");

    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(report) => print_report(&report),
            Err(e) => {
                let err = Error::from(e);
                tracing::error!(category = %err.category(), error = %err, "Crawl job failed");
                println!("  FAILED: {err}");
                failures.push(err);
            }
        }
    }

    let snapshot = stats.snapshot();
    println!("\nTotals");
    println!("------");
    println!("Requests: {} ({} retries)", snapshot.requests_dispatched, snapshot.retries);
    println!("Abandoned: {}", snapshot.fetch_failures);
    println!("Duplicates dropped: {}", snapshot.duplicates);
    println!(
        "Items: {} accepted, {} rejected",
        snapshot.items_accepted, snapshot.items_rejected
    );
    println!(
        "Skipped pages: {} parse errors, {} extraction failures",
        snapshot.parse_errors, snapshot.extraction_failures
    );
    println!("Downloaded: {}", format_bytes(snapshot.bytes_fetched));
    println!("Acceptance rate: {:.1}%", snapshot.acceptance_rate() * 100.0);

    if !failures.is_empty() {
        anyhow::bail!("{} of the crawl jobs failed", failures.len());
    }

    Ok(())
}

/// Registry limited to `sites`, with `max_page` applied
fn select_sites(config: &Config, sites: &[String], max_page: Option<u32>) -> Result<SiteRegistry> {
    let mut configs: Vec<SiteAdapterConfig> = config.site_configs();

    if !sites.is_empty() {
        for id in sites {
            if !configs.iter().any(|c| &c.id == id) {
                return Err(CrawlerError::UnknownSite(id.clone()).into());
            }
        }
        configs.retain(|c| sites.contains(&c.id));
    }

    if let Some(max_page) = max_page {
        configs = configs
            .into_iter()
            .map(|c| c.with_max_page(max_page))
            .collect();
    }

    SiteRegistry::from_configs(configs).context("Invalid site configuration")
}

fn print_report(report: &JobReport) {
    println!(
        "[{}] {}{}",
        report.site,
        report.status,
        if report.aborted { " (aborted)" } else { "" }
    );
    println!("  Listing pages: {}", report.listing_pages);
    println!("  Articles fetched: {}", report.articles_fetched);
    println!(
        "  Items: {} accepted, {} rejected, {} failed to store",
        report.items_accepted, report.items_rejected, report.items_failed
    );
    println!(
        "  Skipped: {} parse errors, {} extraction failures, {} abandoned requests",
        report.parse_errors, report.extraction_failures, report.abandoned
    );
    println!("  Elapsed: {:.1}s", report.elapsed_ms as f64 / 1000.0);
}
