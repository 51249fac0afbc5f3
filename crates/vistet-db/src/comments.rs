//! Database operations for the `comments` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A comment joined with its author's name and the outfit's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub outfit_id: i64,
    pub outfit_name: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CommentWrite {
    pub user_id: i64,
    pub outfit_id: i64,
    pub title: String,
    pub message: String,
}

const COMMENT_SELECT: &str = "SELECT c.id, c.user_id, u.name AS user_name, c.outfit_id, \
            o.name AS outfit_name, c.title, c.message, c.created_at, c.updated_at \
     FROM comments c \
     JOIN users u ON u.id = c.user_id \
     JOIN outfits o ON o.id = c.outfit_id";

/// Inserts a comment and returns it with the joined names.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the user or outfit does not exist or the
/// insert fails.
pub async fn create_comment(pool: &PgPool, comment: &CommentWrite) -> Result<CommentRow, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO comments (user_id, outfit_id, title, message) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(comment.user_id)
    .bind(comment.outfit_id)
    .bind(&comment.title)
    .bind(&comment.message)
    .fetch_one(pool)
    .await?;

    get_comment(pool, id).await?.ok_or(DbError::NotFound)
}

/// Returns a comment by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_comment(pool: &PgPool, id: i64) -> Result<Option<CommentRow>, DbError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Replaces every writable column of a comment.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no comment has this id, or
/// [`DbError::Sqlx`] on constraint violations or query failure.
pub async fn update_comment(
    pool: &PgPool,
    id: i64,
    comment: &CommentWrite,
) -> Result<CommentRow, DbError> {
    let result = sqlx::query(
        "UPDATE comments \
         SET user_id = $2, outfit_id = $3, title = $4, message = $5, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(comment.user_id)
    .bind(comment.outfit_id)
    .bind(&comment.title)
    .bind(&comment.message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_comment(pool, id).await?.ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no comment has this id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_comment(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
