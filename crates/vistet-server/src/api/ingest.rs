//! Scraped-product ingestion endpoints.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use serde_json::Value;
use vistet_core::{FieldErrors, ScrapedProduct};
use vistet_db::IngestError;

use crate::middleware::RequestId;

use super::clothes::ClotheResponse;
use super::{map_db_error, ApiError, ApiJson, AppState};

/// One entry the bulk endpoint did not store.
#[derive(Debug, Serialize)]
pub(in crate::api) struct SkippedEntry {
    /// Position in the submitted `products` array.
    pub index: usize,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct BulkResponse {
    pub message: String,
    pub created: usize,
    pub updated: usize,
    pub skipped: Vec<SkippedEntry>,
    pub created_items: Vec<ClotheResponse>,
    pub updated_items: Vec<ClotheResponse>,
}

fn map_ingest_error(request_id: String, error: &IngestError) -> ApiError {
    match error {
        IngestError::Validation(fields) => {
            ApiError::validation(request_id, "invalid product", fields.clone())
        }
        IngestError::Db(e) => map_db_error(request_id, e),
    }
}

/// POST /api/clothe/from-scraped/: 201 when created, 200 when an existing
/// clothe with the same name was overwritten.
pub(in crate::api) async fn create_from_scraped(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<ClotheResponse>), ApiError> {
    let product = ScrapedProduct::from_value(&body).map_err(|fields| {
        tracing::info!(request_id = req_id.0.as_str(), %fields, "rejected scraped product");
        ApiError::validation(&req_id.0, "invalid product", fields)
    })?;

    let (row, created) =
        vistet_db::normalize_and_upsert(&state.pool, &state.scraped_store, &product)
            .await
            .map_err(|e| {
                tracing::warn!(
                    request_id = req_id.0.as_str(),
                    product_id = product.id,
                    error = %e,
                    "scraped product not stored"
                );
                map_ingest_error(req_id.0.clone(), &e)
            })?;

    tracing::info!(
        product_id = product.id,
        clothe_id = row.id,
        created,
        "stored scraped product"
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(row.into())))
}

/// POST /api/clothe/bulk-from-scraped/: every entry of `products` is
/// validated and stored on its own; failures are listed in `skipped`.
pub(in crate::api) async fn bulk_create_from_scraped(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<BulkResponse>), ApiError> {
    let Some(entries) = body.get("products").and_then(Value::as_array) else {
        let mut fields = FieldErrors::new();
        fields.add("products", "Expected a list of items.");
        return Err(ApiError::validation(
            &req_id.0,
            "products must be a list",
            fields,
        ));
    };

    let mut skipped = Vec::new();
    let mut valid = Vec::with_capacity(entries.len());
    let mut positions = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match ScrapedProduct::from_value(entry) {
            Ok(product) => {
                valid.push(product);
                positions.push(index);
            }
            Err(fields) => skipped.push(SkippedEntry {
                index,
                title: entry
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                error: fields.to_string(),
            }),
        }
    }

    let summary =
        vistet_db::bulk_normalize_and_upsert(&state.pool, &state.scraped_store, &valid)
            .await
            .map_err(|e| map_ingest_error(req_id.0.clone(), &e))?;

    for failed in summary.failed {
        let index = positions[failed.index];
        tracing::warn!(
            request_id = req_id.0.as_str(),
            index,
            title = failed.title.as_str(),
            error = failed.error.as_str(),
            "bulk entry not stored"
        );
        skipped.push(SkippedEntry {
            index,
            title: failed.title,
            error: failed.error,
        });
    }
    skipped.sort_by_key(|s| s.index);

    let created = summary.created_items.len();
    let updated = summary.updated_items.len();
    tracing::info!(
        received = entries.len(),
        created,
        updated,
        skipped = skipped.len(),
        "bulk ingestion complete"
    );

    let status = if created > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(BulkResponse {
            message: format!("Processed {} products", created + updated),
            created,
            updated,
            skipped,
            created_items: summary
                .created_items
                .into_iter()
                .map(ClotheResponse::from)
                .collect(),
            updated_items: summary
                .updated_items
                .into_iter()
                .map(ClotheResponse::from)
                .collect(),
        }),
    ))
}
