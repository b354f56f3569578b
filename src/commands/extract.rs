use std::time::Duration;

use newsharvest::classifier::{Classifier, HttpClassifier};
use newsharvest::config::Config;
use newsharvest::crawler::orchestrator::extract_article;
use newsharvest::crawler::SiteFetcher;
use newsharvest::error::{Error, Result};
use newsharvest::utils::truncate_text;

/// Fetch one article, print it as JSON, and classify it when an endpoint is set
pub async fn extract(config: &Config, url: &str) -> Result<()> {
    let registry = config.registry()?;
    let fetcher = SiteFetcher::from_config(&config.crawler)?;

    let item = extract_article(&registry, &fetcher, url, &config.crawler.retry_config()).await?;

    tracing::info!(
        site = %item.site,
        title = item.title.as_deref().unwrap_or(""),
        fragments = item.content.len(),
        preview = %truncate_text(&item.text(), 80),
        "Article extracted"
    );
    println!("{}", serde_json::to_string_pretty(&item.record())?);

    let Some(endpoint) = config.classifier.endpoint.as_deref() else {
        return Ok(());
    };

    let classifier = HttpClassifier::with_timeout(
        endpoint,
        Duration::from_secs(config.classifier.timeout_secs),
    )?;
    let classification = classifier
        .classify(&item.text())
        .await
        .map_err(|e| Error::with_source(format!("Classification via {endpoint} failed"), e))?;

    println!("{}", serde_json::to_string_pretty(&classification)?);

    Ok(())
}
