//! Clothe handlers: manual create/read/update/delete and catalog statistics.
//! Scraped ingestion lives in `ingest`.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vistet_core::validate::{is_absolute_url, require_text};
use vistet_core::{available_sizes, price_range, ClothingType, FieldErrors, PriceRange};
use vistet_db::{ClotheRow, ClotheWrite};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiJson, AppState};

const NAME_MAX_CHARS: usize = 255;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ClotheRequest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub clothing_type: Option<String>,
    #[serde(default)]
    pub image: String,
    pub shopify_id: Option<i64>,
    pub gid: Option<String>,
    pub vendor: Option<String>,
    pub base_price: Option<Decimal>,
    pub variants: Option<Value>,
    pub user_id: Option<i64>,
    pub store_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ClotheResponse {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub clothing_type: String,
    pub type_label: String,
    pub image: String,
    pub shopify_id: Option<i64>,
    pub gid: Option<String>,
    pub vendor: Option<String>,
    pub base_price: Option<Decimal>,
    pub variants: Value,
    pub price_range: PriceRange,
    pub available_sizes: Vec<String>,
    pub user_id: Option<i64>,
    pub store_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct VendorCount {
    pub vendor: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct StatsResponse {
    pub total_clothes: i64,
    /// Display label (`"Shorts"`, ...) to count.
    pub clothes_by_type: BTreeMap<String, i64>,
    pub clothes_by_vendor: Vec<VendorCount>,
    pub scraped_from_shopify: i64,
}

impl From<ClotheRow> for ClotheResponse {
    fn from(row: ClotheRow) -> Self {
        let type_label = type_label(&row.clothing_type);
        Self {
            price_range: price_range(&row.variants),
            available_sizes: available_sizes(&row.variants),
            id: row.id,
            name: row.name,
            clothing_type: row.clothing_type,
            type_label,
            image: row.image,
            shopify_id: row.shopify_id,
            gid: row.gid,
            vendor: row.vendor,
            base_price: row.base_price,
            variants: row.variants,
            user_id: row.user_id,
            store_id: row.store_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn type_label(stored: &str) -> String {
    ClothingType::from_str(stored).map_or_else(|_| stored.to_owned(), |t| t.label().to_owned())
}

impl ClotheRequest {
    fn into_write(self) -> Result<ClotheWrite, FieldErrors> {
        let mut errors = FieldErrors::new();

        require_text(&mut errors, "name", &self.name, NAME_MAX_CHARS);

        let clothing_type = match self.clothing_type.as_deref() {
            None => ClothingType::Other,
            Some(raw) => ClothingType::from_str(raw).unwrap_or_else(|_| {
                errors.add("type", format!("\"{raw}\" is not a valid choice."));
                ClothingType::Other
            }),
        };

        if !self.image.is_empty() && !is_absolute_url(&self.image) {
            errors.add("image", "Enter a valid URL.");
        }

        if self.base_price.is_some_and(|p| p.is_sign_negative()) {
            errors.add(
                "base_price",
                "Ensure this value is greater than or equal to 0.",
            );
        }

        let variants = match self.variants {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(v @ Value::Array(_)) => v,
            Some(_) => {
                errors.add("variants", "Expected a list of items.");
                Value::Array(Vec::new())
            }
        };

        if self.user_id.is_some() == self.store_id.is_some() {
            errors.add(
                "non_field_errors",
                "A clothe must belong to either a user or a store, not both.",
            );
        }

        errors.into_result()?;

        Ok(ClotheWrite {
            name: self.name.trim().to_owned(),
            clothing_type,
            image: self.image,
            shopify_id: self.shopify_id,
            gid: self.gid,
            vendor: self.vendor,
            base_price: self.base_price,
            variants,
            user_id: self.user_id,
            store_id: self.store_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/clothe/
pub(in crate::api) async fn create_clothe(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<ClotheRequest>,
) -> Result<(StatusCode, Json<ClotheResponse>), ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid clothe", f))?;

    let row = vistet_db::create_clothe(&state.pool, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /api/clothe/{id}/
pub(in crate::api) async fn get_clothe(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ClotheResponse>, ApiError> {
    let row = vistet_db::get_clothe(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "clothe"))?;

    Ok(Json(row.into()))
}

/// PUT /api/clothe/{id}/: full replacement.
pub(in crate::api) async fn update_clothe(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<ClotheRequest>,
) -> Result<Json<ClotheResponse>, ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid clothe", f))?;

    let row = vistet_db::update_clothe(&state.pool, id, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    Ok(Json(row.into()))
}

/// DELETE /api/clothe/{id}/
pub(in crate::api) async fn delete_clothe(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    vistet_db::delete_clothe(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/clothe/stats/
pub(in crate::api) async fn clothe_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = vistet_db::clothe_stats(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    Ok(Json(StatsResponse {
        total_clothes: stats.total_clothes,
        clothes_by_type: stats
            .by_type
            .into_iter()
            .map(|row| (type_label(&row.key), row.count))
            .collect(),
        clothes_by_vendor: stats
            .by_vendor
            .into_iter()
            .map(|row| VendorCount {
                vendor: row.key,
                count: row.count,
            })
            .collect(),
        scraped_from_shopify: stats.scraped_from_shopify,
    }))
}
