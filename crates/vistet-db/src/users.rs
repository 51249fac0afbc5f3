//! Database operations for the `users` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub description: Option<String>,
    pub contact_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserWrite {
    pub email: String,
    pub name: String,
    pub description: Option<String>,
    pub contact_number: Option<String>,
    pub is_active: bool,
}

const USER_COLUMNS: &str =
    "id, email, name, description, contact_number, is_active, created_at, updated_at";

/// Inserts a user and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation on `email`.
pub async fn create_user(pool: &PgPool, user: &UserWrite) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (email, name, description, contact_number, is_active) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.description)
    .bind(&user.contact_number)
    .bind(user.is_active)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a user by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user(pool: &PgPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replaces every writable column of a user.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_user(pool: &PgPool, id: i64, user: &UserWrite) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE users \
         SET email = $2, name = $3, description = $4, contact_number = $5, \
             is_active = $6, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.description)
    .bind(&user.contact_number)
    .bind(user.is_active)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a user together with their clothes, outfits, and comments.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has this id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_user(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
