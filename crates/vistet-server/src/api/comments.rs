use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vistet_core::validate::require_text;
use vistet_core::FieldErrors;
use vistet_db::{CommentRow, CommentWrite};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CommentRequest {
    pub user_id: Option<i64>,
    pub outfit_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct CommentResponse {
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

impl From<CommentRow> for CommentResponse {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            outfit_id: row.outfit_id,
            outfit_name: row.outfit_name,
            title: row.title,
            message: row.message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl CommentRequest {
    fn into_write(self) -> Result<CommentWrite, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.user_id.is_none() {
            errors.add("user_id", "This field is required.");
        }
        if self.outfit_id.is_none() {
            errors.add("outfit_id", "This field is required.");
        }
        require_text(&mut errors, "title", &self.title, 100);
        if self.message.trim().is_empty() {
            errors.add("message", "This field may not be blank.");
        }
        errors.into_result()?;

        Ok(CommentWrite {
            user_id: self.user_id.unwrap_or_default(),
            outfit_id: self.outfit_id.unwrap_or_default(),
            title: self.title.trim().to_owned(),
            message: self.message,
        })
    }
}

/// POST /api/comment/
pub(in crate::api) async fn create_comment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid comment", f))?;
    let row = vistet_db::create_comment(&state.pool, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /api/comment/{id}/
pub(in crate::api) async fn get_comment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<CommentResponse>, ApiError> {
    let row = vistet_db::get_comment(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "comment"))?;
    Ok(Json(row.into()))
}

/// PUT /api/comment/{id}/
pub(in crate::api) async fn update_comment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<CommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid comment", f))?;
    let row = vistet_db::update_comment(&state.pool, id, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(Json(row.into()))
}

/// DELETE /api/comment/{id}/
pub(in crate::api) async fn delete_comment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    vistet_db::delete_comment(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}
