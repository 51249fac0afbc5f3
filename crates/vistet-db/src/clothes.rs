//! Database operations for the `clothes` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use vistet_core::ClothingType;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `clothes` table.
///
/// `variants` is the storefront's variant list stored verbatim as JSONB.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClotheRow {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    pub clothing_type: String,
    pub image: String,
    pub shopify_id: Option<i64>,
    pub gid: Option<String>,
    pub vendor: Option<String>,
    pub base_price: Option<Decimal>,
    pub variants: serde_json::Value,
    pub user_id: Option<i64>,
    pub store_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct UpsertedClotheRow {
    #[sqlx(flatten)]
    clothe: ClotheRow,
    created: bool,
}

/// Column values for creating, replacing, or upserting a clothe.
#[derive(Debug, Clone)]
pub struct ClotheWrite {
    pub name: String,
    pub clothing_type: ClothingType,
    pub image: String,
    pub shopify_id: Option<i64>,
    pub gid: Option<String>,
    pub vendor: Option<String>,
    pub base_price: Option<Decimal>,
    pub variants: serde_json::Value,
    pub user_id: Option<i64>,
    pub store_id: Option<i64>,
}

/// A `(label, count)` pair from a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CountRow {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct ClotheStats {
    pub total_clothes: i64,
    /// Stored type (`"SHORTS"`, ...) with its count, only non-zero types.
    pub by_type: Vec<CountRow>,
    /// Ten most frequent non-empty vendors, most frequent first.
    pub by_vendor: Vec<CountRow>,
    pub scraped_from_shopify: i64,
}

const CLOTHE_COLUMNS: &str = "id, name, type, image, shopify_id, gid, vendor, base_price, \
     variants, user_id, store_id, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a clothe and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on any constraint violation (owner check,
/// unique name, unique `shopify_id`, unknown owner id) or query failure.
pub async fn create_clothe(pool: &PgPool, clothe: &ClotheWrite) -> Result<ClotheRow, DbError> {
    let row = sqlx::query_as::<_, ClotheRow>(&format!(
        "INSERT INTO clothes \
             (name, type, image, shopify_id, gid, vendor, base_price, variants, user_id, store_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {CLOTHE_COLUMNS}"
    ))
    .bind(&clothe.name)
    .bind(clothe.clothing_type.as_str())
    .bind(&clothe.image)
    .bind(clothe.shopify_id)
    .bind(&clothe.gid)
    .bind(&clothe.vendor)
    .bind(clothe.base_price)
    .bind(&clothe.variants)
    .bind(clothe.user_id)
    .bind(clothe.store_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a clothe by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_clothe(pool: &PgPool, id: i64) -> Result<Option<ClotheRow>, DbError> {
    let row = sqlx::query_as::<_, ClotheRow>(&format!(
        "SELECT {CLOTHE_COLUMNS} FROM clothes WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns a clothe by its exact name, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_clothe_by_name(pool: &PgPool, name: &str) -> Result<Option<ClotheRow>, DbError> {
    let row = sqlx::query_as::<_, ClotheRow>(&format!(
        "SELECT {CLOTHE_COLUMNS} FROM clothes WHERE name = $1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replaces every writable column of a clothe.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no clothe has this id, or
/// [`DbError::Sqlx`] on constraint violations or query failure.
pub async fn update_clothe(
    pool: &PgPool,
    id: i64,
    clothe: &ClotheWrite,
) -> Result<ClotheRow, DbError> {
    let row = sqlx::query_as::<_, ClotheRow>(&format!(
        "UPDATE clothes \
         SET name = $2, type = $3, image = $4, shopify_id = $5, gid = $6, vendor = $7, \
             base_price = $8, variants = $9, user_id = $10, store_id = $11, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {CLOTHE_COLUMNS}"
    ))
    .bind(id)
    .bind(&clothe.name)
    .bind(clothe.clothing_type.as_str())
    .bind(&clothe.image)
    .bind(clothe.shopify_id)
    .bind(&clothe.gid)
    .bind(&clothe.vendor)
    .bind(clothe.base_price)
    .bind(&clothe.variants)
    .bind(clothe.user_id)
    .bind(clothe.store_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a clothe and its outfit memberships.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no clothe has this id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_clothe(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM clothes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Upserts a clothe keyed by `name`.
///
/// On conflict the type, image, vendor ids, price, variants, and owner are
/// overwritten; `created_at` is kept and `updated_at` is bumped. The second
/// tuple element is `true` when the row was inserted. It comes from
/// `xmax = 0` in the same statement, so concurrent callers cannot both
/// observe a create.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on constraint violations (owner check, a
/// `shopify_id` already held by a differently named clothe) or query failure.
pub async fn upsert_scraped_clothe(
    pool: &PgPool,
    clothe: &ClotheWrite,
) -> Result<(ClotheRow, bool), DbError> {
    let row = sqlx::query_as::<_, UpsertedClotheRow>(&format!(
        "INSERT INTO clothes \
             (name, type, image, shopify_id, gid, vendor, base_price, variants, user_id, store_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (name) DO UPDATE SET \
             type       = EXCLUDED.type, \
             image      = EXCLUDED.image, \
             shopify_id = EXCLUDED.shopify_id, \
             gid        = EXCLUDED.gid, \
             vendor     = EXCLUDED.vendor, \
             base_price = EXCLUDED.base_price, \
             variants   = EXCLUDED.variants, \
             user_id    = EXCLUDED.user_id, \
             store_id   = EXCLUDED.store_id, \
             updated_at = NOW() \
         RETURNING {CLOTHE_COLUMNS}, (xmax = 0) AS created"
    ))
    .bind(&clothe.name)
    .bind(clothe.clothing_type.as_str())
    .bind(&clothe.image)
    .bind(clothe.shopify_id)
    .bind(&clothe.gid)
    .bind(&clothe.vendor)
    .bind(clothe.base_price)
    .bind(&clothe.variants)
    .bind(clothe.user_id)
    .bind(clothe.store_id)
    .fetch_one(pool)
    .await?;

    Ok((row.clothe, row.created))
}

/// Catalog-wide counts: total, per type, top ten vendors, and how many
/// clothes carry a vendor product id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn clothe_stats(pool: &PgPool) -> Result<ClotheStats, DbError> {
    let total_clothes = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clothes")
        .fetch_one(pool)
        .await?;

    let by_type = sqlx::query_as::<_, CountRow>(
        "SELECT type AS key, COUNT(*) AS count \
         FROM clothes \
         GROUP BY type \
         ORDER BY count DESC, type",
    )
    .fetch_all(pool)
    .await?;

    let by_vendor = sqlx::query_as::<_, CountRow>(
        "SELECT vendor AS key, COUNT(*) AS count \
         FROM clothes \
         WHERE vendor IS NOT NULL AND vendor <> '' \
         GROUP BY vendor \
         ORDER BY count DESC, vendor \
         LIMIT 10",
    )
    .fetch_all(pool)
    .await?;

    let scraped_from_shopify =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clothes WHERE shopify_id IS NOT NULL")
            .fetch_one(pool)
            .await?;

    Ok(ClotheStats {
        total_clothes,
        by_type,
        by_vendor,
        scraped_from_shopify,
    })
}
