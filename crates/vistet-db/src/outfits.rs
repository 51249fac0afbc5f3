//! Database operations for `outfits` and `outfit_components`.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::DbError;

/// An outfit joined with its owner's name and component clothe ids.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutfitRow {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub name: String,
    pub rating: i16,
    /// Component clothe ids in ascending order.
    pub components: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutfitRow {
    #[must_use]
    pub fn components_count(&self) -> usize {
        self.components.len()
    }
}

#[derive(Debug, Clone)]
pub struct OutfitWrite {
    pub user_id: i64,
    pub name: String,
    pub rating: i16,
    pub components: Vec<i64>,
}

const OUTFIT_SELECT: &str = "SELECT o.id, o.user_id, u.name AS user_name, o.name, o.rating, \
            COALESCE( \
                ARRAY_AGG(oc.clothe_id ORDER BY oc.clothe_id) \
                    FILTER (WHERE oc.clothe_id IS NOT NULL), \
                '{}'::BIGINT[] \
            ) AS components, \
            o.created_at, o.updated_at \
     FROM outfits o \
     JOIN users u ON u.id = o.user_id \
     LEFT JOIN outfit_components oc ON oc.outfit_id = o.id";

/// Inserts an outfit with its components in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the user or any component clothe does not
/// exist (foreign-key violation), the rating is out of range, or a query
/// fails.
pub async fn create_outfit(pool: &PgPool, outfit: &OutfitWrite) -> Result<OutfitRow, DbError> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO outfits (user_id, name, rating) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(outfit.user_id)
    .bind(&outfit.name)
    .bind(outfit.rating)
    .fetch_one(&mut *tx)
    .await?;

    insert_components(&mut tx, id, &outfit.components).await?;
    tx.commit().await?;

    get_outfit(pool, id).await?.ok_or(DbError::NotFound)
}

/// Returns an outfit by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_outfit(pool: &PgPool, id: i64) -> Result<Option<OutfitRow>, DbError> {
    let row = sqlx::query_as::<_, OutfitRow>(&format!(
        "{OUTFIT_SELECT} WHERE o.id = $1 GROUP BY o.id, u.name"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replaces an outfit's columns and its full component set.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no outfit has this id, or
/// [`DbError::Sqlx`] on constraint violations or query failure.
pub async fn update_outfit(
    pool: &PgPool,
    id: i64,
    outfit: &OutfitWrite,
) -> Result<OutfitRow, DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE outfits \
         SET user_id = $2, name = $3, rating = $4, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(outfit.user_id)
    .bind(&outfit.name)
    .bind(outfit.rating)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    sqlx::query("DELETE FROM outfit_components WHERE outfit_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_components(&mut tx, id, &outfit.components).await?;
    tx.commit().await?;

    get_outfit(pool, id).await?.ok_or(DbError::NotFound)
}

/// Deletes an outfit with its components and comments.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no outfit has this id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_outfit(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM outfits WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

async fn insert_components(
    tx: &mut Transaction<'_, Postgres>,
    outfit_id: i64,
    components: &[i64],
) -> Result<(), DbError> {
    if components.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO outfit_components (outfit_id, clothe_id) \
         SELECT $1, clothe_id FROM UNNEST($2::BIGINT[]) AS t(clothe_id) \
         ON CONFLICT DO NOTHING",
    )
    .bind(outfit_id)
    .bind(components)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
