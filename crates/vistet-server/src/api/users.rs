use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vistet_core::validate::{is_valid_email, is_valid_phone, require_text, PHONE_FORMAT_MESSAGE};
use vistet_core::FieldErrors;
use vistet_db::{UserRow, UserWrite};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct UserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub contact_number: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub description: Option<String>,
    pub contact_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            description: row.description,
            contact_number: row.contact_number,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl UserRequest {
    fn into_write(self) -> Result<UserWrite, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = self.email.trim().to_lowercase();
        if email.is_empty() {
            errors.add("email", "This field may not be blank.");
        } else if !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }
        require_text(&mut errors, "name", &self.name, 100);

        let contact_number = self
            .contact_number
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());
        if contact_number.as_deref().is_some_and(|c| !is_valid_phone(c)) {
            errors.add("contact_number", PHONE_FORMAT_MESSAGE);
        }

        errors.into_result()?;

        Ok(UserWrite {
            email,
            name: self.name.trim().to_owned(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            contact_number,
            is_active: self.is_active,
        })
    }
}

/// POST /api/user/
pub(in crate::api) async fn create_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid user", f))?;
    let row = vistet_db::create_user(&state.pool, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /api/user/{id}/
pub(in crate::api) async fn get_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let row = vistet_db::get_user(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "user"))?;
    Ok(Json(row.into()))
}

/// PUT /api/user/{id}/
pub(in crate::api) async fn update_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let write = body
        .into_write()
        .map_err(|f| ApiError::validation(&req_id.0, "invalid user", f))?;
    let row = vistet_db::update_user(&state.pool, id, &write)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(Json(row.into()))
}

/// DELETE /api/user/{id}/: also removes the user's clothes, outfits and
/// comments.
pub(in crate::api) async fn delete_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    vistet_db::delete_user(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(value: serde_json::Value) -> UserRequest {
        serde_json::from_value(value).expect("request shape")
    }

    #[test]
    fn valid_user_is_normalized() {
        let write = request(json!({
            "email": " Ana@Example.CL ",
            "name": "Ana",
            "contact_number": "+56 9 1234 5678"
        }))
        .into_write()
        .unwrap();
        assert_eq!(write.email, "ana@example.cl");
        assert!(write.is_active);
        assert_eq!(write.contact_number.as_deref(), Some("+56 9 1234 5678"));
    }

    #[test]
    fn bad_phone_and_email_are_reported_together() {
        let errors = request(json!({
            "email": "ana",
            "name": "",
            "contact_number": "12345"
        }))
        .into_write()
        .unwrap_err();
        assert!(errors.contains("email"));
        assert!(errors.contains("name"));
        assert!(errors.contains("contact_number"));
    }

    #[test]
    fn blank_phone_is_treated_as_absent() {
        let write = request(json!({"email": "a@b.cl", "name": "A", "contact_number": " "}))
            .into_write()
            .unwrap();
        assert!(write.contact_number.is_none());
    }
}
