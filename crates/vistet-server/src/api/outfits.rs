use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vistet_core::validate::require_text;
use vistet_core::FieldErrors;
use vistet_db::{OutfitRow, OutfitWrite};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct OutfitRequest {
    pub user_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    pub rating: Option<i16>,
    #[serde(default)]
    pub components: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct OutfitResponse {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub name: String,
    pub rating: i16,
    pub components: Vec<i64>,
    pub components_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OutfitRow> for OutfitResponse {
    fn from(row: OutfitRow) -> Self {
        Self {
            components_count: row.components_count(),
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            name: row.name,
            rating: row.rating,
            components: row.components,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl OutfitRequest {
    fn into_write(self) -> Result<OutfitWrite, FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.user_id.is_none() {
            errors.add("user_id", "This field is required.");
        }
        require_text(&mut errors, "name", &self.name, 100);
        match self.rating {
            None => errors.add("rating", "This field is required."),
            Some(r) if !(1..=5).contains(&r) => {
                errors.add("rating", "Rating must be between 1 and 5.");
            }
            Some(_) => {}
        }

        errors.into_result()?;

        let mut components = self.components;
        components.sort_unstable();
        components.dedup();

        Ok(OutfitWrite {
            user_id: self.user_id.unwrap_or_default(),
            name: self.name.trim().to_owned(),
            rating: self.rating.unwrap_or_default(),
            components,
        })
    }
}

/// POST /api/outfit/
pub(in crate::api) async fn create_outfit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<OutfitRequest>,
) -> Result<(StatusCode, Json<OutfitResponse>), ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid outfit", f))?;
    let row = vistet_db::create_outfit(&state.pool, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /api/outfit/{id}/
pub(in crate::api) async fn get_outfit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<OutfitResponse>, ApiError> {
    let row = vistet_db::get_outfit(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "outfit"))?;
    Ok(Json(row.into()))
}

/// PUT /api/outfit/{id}/: replaces the component list too.
pub(in crate::api) async fn update_outfit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<OutfitRequest>,
) -> Result<Json<OutfitResponse>, ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid outfit", f))?;
    let row = vistet_db::update_outfit(&state.pool, id, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(Json(row.into()))
}

/// DELETE /api/outfit/{id}/
pub(in crate::api) async fn delete_outfit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    vistet_db::delete_outfit(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}
