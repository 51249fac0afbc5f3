pub mod catalog;
pub mod client;
pub mod error;
pub mod extract;
pub(crate) mod rate_limit;

pub use catalog::{BulkOutcome, CatalogClient, SkippedEntry, SubmitOutcome};
pub use client::StorefrontClient;
pub use error::ScraperError;
pub use extract::{
    extract_page, extract_products, normalize_image_url, resolve_display_name, PageExtraction,
};
