//! Client for the catalog service's ingestion endpoints.
//!
//! Submissions are not retried: a failed record is reported to the caller,
//! who decides whether the run continues.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use vistet_core::{FieldErrors, ScrapedProduct};

use crate::error::ScraperError;

const SINGLE_PATH: &str = "clothe/from-scraped/";
const BULK_PATH: &str = "clothe/bulk-from-scraped/";

/// Upper bound on how much of an unparseable error body ends up in a message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// What the catalog did with one submitted product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub id: i64,
    pub name: String,
    /// `true` on 201, `false` on 200.
    pub created: bool,
}

/// One entry the catalog skipped during a bulk submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub index: usize,
    #[serde(default)]
    pub title: String,
    pub error: String,
}

/// Summary returned by the bulk endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BulkOutcome {
    #[serde(default)]
    pub message: String,
    pub created: usize,
    pub updated: usize,
    #[serde(default)]
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Deserialize)]
struct ItemRef {
    id: i64,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    fields: FieldErrors,
}

#[derive(Serialize)]
struct BulkRequest<'a> {
    products: &'a [ScrapedProduct],
}

pub struct CatalogClient {
    client: Client,
    single_url: Url,
    bulk_url: Url,
    submit_timeout: Duration,
    bulk_timeout: Duration,
}

impl CatalogClient {
    /// `api_base_url` is the service's API root, e.g.
    /// `http://localhost:8000/api/`. A missing trailing slash is added so
    /// the endpoint paths join under it rather than replacing its last
    /// segment.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] when the base does not parse and
    /// [`ScraperError::Http`] when the HTTP client cannot be built.
    pub fn new(
        api_base_url: &str,
        user_agent: &str,
        submit_timeout_secs: u64,
        bulk_timeout_secs: u64,
    ) -> Result<Self, ScraperError> {
        let base = if api_base_url.ends_with('/') {
            api_base_url.to_owned()
        } else {
            format!("{api_base_url}/")
        };
        let invalid = |e: url::ParseError| ScraperError::InvalidUrl {
            url: api_base_url.to_owned(),
            reason: e.to_string(),
        };
        let base = Url::parse(&base).map_err(invalid)?;
        let single_url = base.join(SINGLE_PATH).map_err(invalid)?;
        let bulk_url = base.join(BULK_PATH).map_err(invalid)?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            single_url,
            bulk_url,
            submit_timeout: Duration::from_secs(submit_timeout_secs),
            bulk_timeout: Duration::from_secs(bulk_timeout_secs),
        })
    }

    /// Submits one product to the single-record endpoint.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Rejected`]: the service answered 4xx
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx
    /// - [`ScraperError::Http`]: network failure or timeout
    /// - [`ScraperError::Deserialize`]: the success body has no item id
    pub async fn submit_product(
        &self,
        product: &ScrapedProduct,
    ) -> Result<SubmitOutcome, ScraperError> {
        let response = self
            .client
            .post(self.single_url.clone())
            .timeout(self.submit_timeout)
            .json(product)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(failure(status, self.single_url.as_str(), &body));
        }

        let item: ItemRef = serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
            context: format!("catalog response for product {}", product.id),
            source: e,
        })?;

        Ok(SubmitOutcome {
            id: item.id,
            name: item.name,
            created: status == StatusCode::CREATED,
        })
    }

    /// Submits a whole page of products to the bulk endpoint in one request.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogClient::submit_product`]; a failure here covers the
    /// whole batch.
    pub async fn submit_bulk(
        &self,
        products: &[ScrapedProduct],
    ) -> Result<BulkOutcome, ScraperError> {
        let response = self
            .client
            .post(self.bulk_url.clone())
            .timeout(self.bulk_timeout)
            .json(&BulkRequest { products })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(failure(status, self.bulk_url.as_str(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
            context: "catalog bulk response".to_owned(),
            source: e,
        })
    }
}

fn failure(status: StatusCode, url: &str, body: &str) -> ScraperError {
    if !status.is_client_error() {
        return ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        };
    }

    let (message, fields) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.fields),
        Err(_) => match serde_json::from_str::<FieldErrors>(body) {
            Ok(fields) => (fields.to_string(), fields),
            Err(_) => (truncate(body), FieldErrors::new()),
        },
    };

    ScraperError::Rejected {
        status: status.as_u16(),
        message,
        fields,
    }
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_owned();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
