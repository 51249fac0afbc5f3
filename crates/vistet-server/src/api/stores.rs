use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vistet_core::validate::{is_absolute_url, is_valid_phone, require_text, PHONE_FORMAT_MESSAGE};
use vistet_core::FieldErrors;
use vistet_db::{StoreRow, StoreWrite};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct StoreRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact_number: String,
    pub site_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct StoreResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub contact_number: String,
    pub site_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoreRow> for StoreResponse {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            contact_number: row.contact_number,
            site_url: row.site_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl StoreRequest {
    fn into_write(self) -> Result<StoreWrite, FieldErrors> {
        let mut errors = FieldErrors::new();

        require_text(&mut errors, "name", &self.name, 100);

        let contact_number = self.contact_number.trim().to_owned();
        if contact_number.is_empty() {
            errors.add("contact_number", "This field may not be blank.");
        } else if !is_valid_phone(&contact_number) {
            errors.add("contact_number", PHONE_FORMAT_MESSAGE);
        }

        let site_url = self
            .site_url
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty());
        if site_url.as_deref().is_some_and(|u| !is_absolute_url(u)) {
            errors.add("site_url", "Enter a valid URL.");
        }

        errors.into_result()?;

        Ok(StoreWrite {
            name: self.name.trim().to_owned(),
            description: self.description,
            contact_number,
            site_url,
        })
    }
}

/// POST /api/store/
pub(in crate::api) async fn create_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<StoreRequest>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid store", f))?;
    let row = vistet_db::create_store(&state.pool, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /api/store/{id}/
pub(in crate::api) async fn get_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<StoreResponse>, ApiError> {
    let row = vistet_db::get_store(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "store"))?;
    Ok(Json(row.into()))
}

/// PUT /api/store/{id}/
pub(in crate::api) async fn update_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<StoreRequest>,
) -> Result<Json<StoreResponse>, ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid store", f))?;
    let row = vistet_db::update_store(&state.pool, id, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(Json(row.into()))
}

/// DELETE /api/store/{id}/: the store's clothes go with it.
pub(in crate::api) async fn delete_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    vistet_db::delete_store(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}
