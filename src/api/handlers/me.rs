//! Authenticated self-service endpoints.
//!
//! Flow Overview:
//! 1) Authenticate via bearer access token.
//! 2) Resolve the current user from the database.
//! 3) Apply allow-listed updates.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::auth::storage::{find_user_by_id, update_profile, UserRecord};
use super::auth::{require_auth, AuthState};

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MeUpdateRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

fn me_response(user: UserRecord) -> MeResponse {
    MeResponse {
        id: user.id.to_string(),
        email: user.email,
        phone: user.phone,
        full_name: user.full_name,
        role: user.role,
        email_verified: user.email_verified,
        phone_verified: user.phone_verified,
        created_at: user.created_at.to_rfc3339(),
        last_login_at: user.last_login_at.map(|at| at.to_rfc3339()),
    }
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Return the authenticated user profile.", body = MeResponse),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    match find_user_by_id(&pool, principal.id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(me_response(user))).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch /v1/me profile: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/v1/me",
    request_body = MeUpdateRequest,
    responses(
        (status = 200, description = "Profile updated.", body = MeResponse),
        (status = 400, description = "Invalid update payload."),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "me"
)]
pub async fn patch_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<MeUpdateRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    let full_name = normalize_optional(payload.full_name);
    let phone = normalize_optional(payload.phone);

    if full_name.is_none() && phone.is_none() {
        return (StatusCode::BAD_REQUEST, "No updates provided.").into_response();
    }

    match update_profile(&pool, principal.id, full_name.as_deref(), phone.as_deref()).await {
        Ok(Some(user)) => (StatusCode::OK, Json(me_response(user))).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update /v1/me profile: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_update_request_rejects_unknown_fields() {
        let result =
            serde_json::from_str::<MeUpdateRequest>(r#"{"full_name":"A","role":"super_admin"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn normalize_optional_drops_blank_values() {
        assert_eq!(normalize_optional(Some(String::new())), None);
        assert_eq!(
            normalize_optional(Some(" Bob ".to_string())),
            Some("Bob".to_string())
        );
    }
}
