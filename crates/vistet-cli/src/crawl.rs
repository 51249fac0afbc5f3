//! `crawl`: fetch a storefront page, extract its products and submit them
//! to the catalog service.
//!
//! A product that the catalog rejects, or a submission that times out, is
//! logged and counted; the rest of the run continues.

use std::path::PathBuf;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use vistet_core::{extract_store_origin, AppConfig, ScrapedProduct};
use vistet_scraper::{
    extract_page, CatalogClient, PageExtraction, ScraperError, StorefrontClient, SubmitOutcome,
};

#[derive(Debug, Clone)]
pub(crate) struct CrawlOptions {
    /// Page to fetch; defaults to the configured storefront URL.
    pub url: Option<String>,
    /// Read HTML from disk instead of fetching it.
    pub html_file: Option<PathBuf>,
    pub bulk: bool,
    pub dry_run: bool,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CrawlReport {
    pub extracted: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl CrawlReport {
    pub(crate) fn saved(&self) -> usize {
        self.created + self.updated
    }

    fn record(&mut self, product: &ScrapedProduct, result: &Result<SubmitOutcome, ScraperError>) {
        match result {
            Ok(outcome) if outcome.created => self.created += 1,
            Ok(_) => self.updated += 1,
            Err(e) => {
                self.failed += 1;
                log_submit_failure(product, e);
            }
        }
    }
}

fn log_submit_failure(product: &ScrapedProduct, error: &ScraperError) {
    match error.field_errors() {
        Some(fields) => tracing::warn!(
            product_id = product.id,
            title = product.title.as_str(),
            error = %error,
            fields = %fields,
            "catalog rejected product"
        ),
        None => tracing::warn!(
            product_id = product.id,
            title = product.title.as_str(),
            error = %error,
            "failed to submit product"
        ),
    }
}

/// Runs one crawl bounded by `options.timeout_secs`.
///
/// # Errors
///
/// Returns an error when the run exceeds its timeout, the page cannot be
/// fetched or read, or a client cannot be built. Individual product
/// failures are counted in the report instead.
pub(crate) async fn run_crawl(
    config: &AppConfig,
    options: &CrawlOptions,
) -> anyhow::Result<CrawlReport> {
    let limit = Duration::from_secs(options.timeout_secs);
    tokio::time::timeout(limit, crawl(config, options))
        .await
        .map_err(|_| anyhow::anyhow!("crawl exceeded {}s timeout", options.timeout_secs))?
}

async fn crawl(config: &AppConfig, options: &CrawlOptions) -> anyhow::Result<CrawlReport> {
    let page_url = options.url.as_deref().unwrap_or(&config.storefront_url);
    let extraction = load_page(config, options, page_url).await?;
    let products = extraction.products;

    tracing::info!(
        page_url,
        meta_products = extraction.meta_products_found,
        image_mappings = extraction.image_mappings,
        products = products.len(),
        "extracted products"
    );

    let mut report = CrawlReport {
        extracted: products.len(),
        ..CrawlReport::default()
    };

    if options.dry_run {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(report);
    }
    if products.is_empty() {
        tracing::warn!(page_url, "no products found on page");
        return Ok(report);
    }

    let catalog = CatalogClient::new(
        &config.api_base_url,
        &config.scraper_user_agent,
        config.submit_timeout_secs,
        config.bulk_submit_timeout_secs,
    )
    .map_err(|e| anyhow::anyhow!("failed to build catalog client: {e}"))?;

    if options.bulk {
        submit_bulk(&catalog, &products, &mut report).await;
    } else {
        submit_each(&catalog, &products, options.concurrency, &mut report).await;
    }

    Ok(report)
}

async fn load_page(
    config: &AppConfig,
    options: &CrawlOptions,
    page_url: &str,
) -> anyhow::Result<PageExtraction> {
    if let Some(path) = &options.html_file {
        let html = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        return Ok(extract_page(&html, &extract_store_origin(page_url)));
    }

    let client = StorefrontClient::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_max_retries,
        config.scraper_retry_backoff_base_secs,
    )
    .map_err(|e| anyhow::anyhow!("failed to build storefront client: {e}"))?;

    client
        .fetch_products(page_url)
        .await
        .map_err(|e| anyhow::anyhow!("failed to fetch {page_url}: {e}"))
}

async fn submit_each(
    catalog: &CatalogClient,
    products: &[ScrapedProduct],
    concurrency: usize,
    report: &mut CrawlReport,
) {
    let results: Vec<(&ScrapedProduct, Result<SubmitOutcome, ScraperError>)> =
        stream::iter(products)
            .map(|product| async move { (product, catalog.submit_product(product).await) })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    for (product, result) in &results {
        if let Ok(outcome) = result {
            tracing::debug!(
                product_id = product.id,
                clothe_id = outcome.id,
                created = outcome.created,
                "submitted product"
            );
        }
        report.record(product, result);
    }
}

async fn submit_bulk(catalog: &CatalogClient, products: &[ScrapedProduct], report: &mut CrawlReport) {
    match catalog.submit_bulk(products).await {
        Ok(outcome) => {
            for entry in &outcome.skipped {
                tracing::warn!(
                    index = entry.index,
                    title = entry.title.as_str(),
                    error = entry.error.as_str(),
                    "catalog skipped product"
                );
            }
            report.created = outcome.created;
            report.updated = outcome.updated;
            report.failed = products.len().saturating_sub(outcome.created + outcome.updated);
            tracing::info!(message = outcome.message.as_str(), "bulk submission accepted");
        }
        Err(e) => {
            match e.field_errors() {
                Some(fields) => {
                    tracing::error!(error = %e, fields = %fields, "bulk submission rejected");
                }
                None => tracing::error!(error = %e, "bulk submission failed"),
            }
            report.failed = products.len();
        }
    }
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
