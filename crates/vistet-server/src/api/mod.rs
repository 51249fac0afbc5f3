mod clothes;
mod comments;
mod ingest;
mod outfits;
mod stores;
mod users;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use vistet_core::FieldErrors;
use vistet_db::ScrapedStore;

use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Store that owns every clothe created through the scraped endpoints.
    pub scraped_store: ScrapedStore,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Per-field messages for `validation_error`.
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub fields: FieldErrors,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                fields: FieldErrors::new(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    /// A `validation_error` carrying field-keyed messages.
    pub fn validation(
        request_id: impl Into<String>,
        message: impl Into<String>,
        fields: FieldErrors,
    ) -> Self {
        let mut err = Self::new(request_id, "validation_error", message);
        err.error.fields = fields;
        err
    }

    pub fn not_found(request_id: impl Into<String>, what: &str) -> Self {
        Self::new(request_id, "not_found", format!("{what} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// `Json` whose rejections (bad syntax, wrong shape, missing content type)
/// come back as a `validation_error` envelope instead of plain text.
pub(in crate::api) struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::info!(
                    request_id = request_id.as_str(),
                    error = %rejection,
                    "rejected request body"
                );
                let mut fields = FieldErrors::new();
                fields.add("non_field_errors", rejection.body_text());
                Err(ApiError::validation(
                    request_id,
                    "malformed request body",
                    fields,
                ))
            }
        }
    }
}

/// Turns a storage failure into a response.
///
/// Constraint violations are the client's problem and keep the constraint
/// name in the message: unique (`23505`) is a conflict, check (`23514`) and
/// foreign key (`23503`) are validation errors. Anything else is logged and
/// reported as an internal error.
pub(super) fn map_db_error(request_id: String, error: &vistet_db::DbError) -> ApiError {
    if matches!(error, vistet_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }

    let constraint = error.constraint().unwrap_or("unknown").to_owned();
    match error.sqlstate().as_deref() {
        Some("23505") => {
            tracing::info!(
                request_id = request_id.as_str(),
                constraint = constraint.as_str(),
                "unique constraint rejected write"
            );
            ApiError::new(
                request_id,
                "conflict",
                format!("a record with these values already exists ({constraint})"),
            )
        }
        Some("23514") => ApiError::new(
            request_id,
            "validation_error",
            format!("violates check constraint {constraint}"),
        ),
        Some("23503") => ApiError::new(
            request_id,
            "validation_error",
            format!("referenced record does not exist ({constraint})"),
        ),
        _ => {
            tracing::error!(
                request_id = request_id.as_str(),
                error = %error,
                "database query failed"
            );
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/clothe/", post(clothes::create_clothe))
        .route("/api/clothe/stats/", get(clothes::clothe_stats))
        .route(
            "/api/clothe/from-scraped/",
            post(ingest::create_from_scraped),
        )
        .route(
            "/api/clothe/bulk-from-scraped/",
            post(ingest::bulk_create_from_scraped),
        )
        .route(
            "/api/clothe/{id}/",
            get(clothes::get_clothe)
                .put(clothes::update_clothe)
                .delete(clothes::delete_clothe),
        )
        .route("/api/user/", post(users::create_user))
        .route(
            "/api/user/{id}/",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/store/", post(stores::create_store))
        .route(
            "/api/store/{id}/",
            get(stores::get_store)
                .put(stores::update_store)
                .delete(stores::delete_store),
        )
        .route("/api/outfit/", post(outfits::create_outfit))
        .route(
            "/api/outfit/{id}/",
            get(outfits::get_outfit)
                .put(outfits::update_outfit)
                .delete(outfits::delete_outfit),
        )
        .route("/api/comment/", post(comments::create_comment))
        .route(
            "/api/comment/{id}/",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health/", get(health))
        .merge(api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match vistet_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
