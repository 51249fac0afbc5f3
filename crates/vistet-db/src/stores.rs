//! Database operations for the `stores` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `stores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub contact_number: String,
    pub site_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values for creating or replacing a store.
#[derive(Debug, Clone)]
pub struct StoreWrite {
    pub name: String,
    pub description: String,
    pub contact_number: String,
    pub site_url: Option<String>,
}

const STORE_COLUMNS: &str =
    "id, name, description, contact_number, site_url, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a store and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation on `name`.
pub async fn create_store(pool: &PgPool, store: &StoreWrite) -> Result<StoreRow, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "INSERT INTO stores (name, description, contact_number, site_url) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(&store.name)
    .bind(&store.description)
    .bind(&store.contact_number)
    .bind(&store.site_url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a store by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_store(pool: &PgPool, id: i64) -> Result<Option<StoreRow>, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns a store by its unique name, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_store_by_name(pool: &PgPool, name: &str) -> Result<Option<StoreRow>, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores WHERE name = $1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replaces every writable column of a store.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no store has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_store(pool: &PgPool, id: i64, store: &StoreWrite) -> Result<StoreRow, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "UPDATE stores \
         SET name = $2, description = $3, contact_number = $4, site_url = $5, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(id)
    .bind(&store.name)
    .bind(&store.description)
    .bind(&store.contact_number)
    .bind(&store.site_url)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a store. Its clothes go with it (`ON DELETE CASCADE`).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no store has this id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_store(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM stores WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Returns the store named `defaults.name`, inserting it from `defaults` if
/// it does not exist yet.
///
/// A single `INSERT ... ON CONFLICT (name)` statement, so concurrent callers
/// all get the same row. The no-op `SET name = stores.name` makes
/// `RETURNING` yield the existing row on conflict; an existing store's
/// other columns are left untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn get_or_create_store(pool: &PgPool, defaults: &StoreWrite) -> Result<StoreRow, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "INSERT INTO stores (name, description, contact_number, site_url) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (name) DO UPDATE SET name = stores.name \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(&defaults.name)
    .bind(&defaults.description)
    .bind(&defaults.contact_number)
    .bind(&defaults.site_url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
