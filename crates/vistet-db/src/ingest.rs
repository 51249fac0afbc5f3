//! Normalize scraped storefront products and upsert them into `clothes`.
//!
//! Every ingested clothe is owned by one designated store, resolved with an
//! atomic get-or-create, so scraped rows satisfy the one-owner check without
//! a human-provided owner.

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use vistet_core::{FieldErrors, ScrapedProduct};

use crate::clothes::{upsert_scraped_clothe, ClotheRow, ClotheWrite};
use crate::stores::{get_or_create_store, StoreRow, StoreWrite};
use crate::DbError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid product: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Identity of the store that owns ingested clothes. Only `name` is used to
/// find an existing store; the other fields seed it on first use.
#[derive(Debug, Clone)]
pub struct ScrapedStore {
    pub name: String,
    pub description: String,
    pub contact_number: String,
    pub site_url: Option<String>,
}

impl Default for ScrapedStore {
    fn default() -> Self {
        Self::named(vistet_core::DEFAULT_SCRAPED_STORE_NAME)
    }
}

impl ScrapedStore {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: name.to_string(),
            contact_number: "+56900000000".to_string(),
            site_url: Some("https://rehabclo.cl".to_string()),
        }
    }

    fn as_store_write(&self) -> StoreWrite {
        StoreWrite {
            name: self.name.clone(),
            description: self.description.clone(),
            contact_number: self.contact_number.clone(),
            site_url: self.site_url.clone(),
        }
    }
}

/// One record of a batch that could not be stored.
#[derive(Debug, Clone, Serialize)]
pub struct FailedRecord {
    /// Position in the submitted batch.
    pub index: usize,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BulkSummary {
    pub created_items: Vec<ClotheRow>,
    pub updated_items: Vec<ClotheRow>,
    pub failed: Vec<FailedRecord>,
}

impl BulkSummary {
    #[must_use]
    pub fn created(&self) -> usize {
        self.created_items.len()
    }

    #[must_use]
    pub fn updated(&self) -> usize {
        self.updated_items.len()
    }
}

/// Build the column values for a scraped product owned by `store`.
///
/// The vendor label goes through the fixed type table and the base price is
/// the first variant's price in major units.
#[must_use]
pub fn clothe_write_for(product: &ScrapedProduct, store: &StoreRow) -> ClotheWrite {
    ClotheWrite {
        name: product.title.trim().to_string(),
        clothing_type: product.clothing_type(),
        image: product.image_url.clone(),
        shopify_id: Some(product.id),
        gid: Some(product.gid.clone()),
        vendor: Some(product.vendor.clone()),
        base_price: product.base_price(),
        variants: product.variants_json(),
        user_id: None,
        store_id: Some(store.id),
    }
}

/// Map, resolve the owning store, and upsert one scraped product by name.
///
/// Returns the stored row and `true` when it was newly created.
///
/// # Errors
///
/// Returns [`IngestError::Validation`] when the title is blank, or
/// [`IngestError::Db`] when the store lookup or the upsert fails (including
/// constraint violations, which are reported as-is).
pub async fn normalize_and_upsert(
    pool: &PgPool,
    store: &ScrapedStore,
    product: &ScrapedProduct,
) -> Result<(ClotheRow, bool), IngestError> {
    let owner = get_or_create_store(pool, &store.as_store_write()).await?;
    upsert_one(pool, &owner, product).await
}

/// Apply [`normalize_and_upsert`] to every product of a batch.
///
/// The owning store is resolved once. A product that fails is recorded in
/// [`BulkSummary::failed`] and the rest of the batch continues.
///
/// # Errors
///
/// Returns [`IngestError::Db`] only when the owning store cannot be resolved.
pub async fn bulk_normalize_and_upsert(
    pool: &PgPool,
    store: &ScrapedStore,
    products: &[ScrapedProduct],
) -> Result<BulkSummary, IngestError> {
    let owner = get_or_create_store(pool, &store.as_store_write()).await?;

    let mut summary = BulkSummary::default();
    for (index, product) in products.iter().enumerate() {
        match upsert_one(pool, &owner, product).await {
            Ok((row, true)) => summary.created_items.push(row),
            Ok((row, false)) => summary.updated_items.push(row),
            Err(e) => summary.failed.push(FailedRecord {
                index,
                title: product.title.clone(),
                error: e.to_string(),
            }),
        }
    }

    Ok(summary)
}

async fn upsert_one(
    pool: &PgPool,
    owner: &StoreRow,
    product: &ScrapedProduct,
) -> Result<(ClotheRow, bool), IngestError> {
    if product.title.trim().is_empty() {
        let mut errors = FieldErrors::new();
        errors.add("title", "This field may not be blank.");
        return Err(IngestError::Validation(errors));
    }
    let write = clothe_write_for(product, owner);
    Ok(upsert_scraped_clothe(pool, &write).await?)
}
