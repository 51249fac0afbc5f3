//! HTTP client for storefront collection pages.

mod origin;

use std::time::Duration;

use reqwest::Client;
use vistet_core::extract_store_origin;

use crate::error::ScraperError;
use crate::extract::{extract_page, PageExtraction};
use crate::rate_limit::retry_with_backoff;

/// Fetches storefront HTML.
///
/// 429 becomes [`ScraperError::RateLimited`], 404 becomes
/// [`ScraperError::NotFound`] and any other non-2xx status becomes
/// [`ScraperError::UnexpectedStatus`]. Transient failures (429, 5xx, network)
/// are retried with exponential backoff up to `max_retries` more attempts.
pub struct StorefrontClient {
    client: Client,
    /// Retry attempts after the first failure.
    max_retries: u32,
    /// Backoff before retry `n` is `backoff_base_secs * 2^n`.
    backoff_base_secs: u64,
}

impl StorefrontClient {
    /// Creates a client with a per-request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches the HTML of one collection page.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`]: `page_url` is not an absolute URL
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries
    /// - [`ScraperError::NotFound`]: HTTP 404, not retried
    /// - [`ScraperError::UnexpectedStatus`]: other non-2xx (5xx retried)
    /// - [`ScraperError::Http`]: network or TLS failure after all retries
    pub async fn fetch_page(&self, page_url: &str) -> Result<String, ScraperError> {
        let url = reqwest::Url::parse(page_url).map_err(|e| ScraperError::InvalidUrl {
            url: page_url.to_owned(),
            reason: e.to_string(),
        })?;
        let referer = extract_store_origin(page_url);

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            let referer = referer.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header(
                        reqwest::header::ACCEPT,
                        "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
                    )
                    .header(reqwest::header::ACCEPT_LANGUAGE, "es-CL,es;q=0.9,en;q=0.8")
                    .header(reqwest::header::REFERER, &referer)
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScraperError::RateLimited {
                        domain: origin::extract_domain(url.as_str()),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ScraperError::NotFound {
                        url: url.to_string(),
                    });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }

    /// Fetches `page_url` and runs the page extractor on it, resolving
    /// relative image paths against the page's own origin.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontClient::fetch_page`]. Extraction itself never fails.
    pub async fn fetch_products(&self, page_url: &str) -> Result<PageExtraction, ScraperError> {
        let html = self.fetch_page(page_url).await?;
        let origin = extract_store_origin(page_url);
        let extraction = extract_page(&html, &origin);
        tracing::info!(
            page_url,
            html_bytes = html.len(),
            meta_products = extraction.meta_products_found,
            image_mappings = extraction.image_mappings,
            products = extraction.products.len(),
            "extracted storefront page"
        );
        Ok(extraction)
    }
}
