//! Credential login issuing the access/refresh token pair.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::password::verify_password;
use super::state::AuthState;
use super::storage::{find_user_by_email, touch_last_login};
use super::token::{TokenError, TokenKind};
use super::types::{LoginRequest, TokenPairResponse};
use super::utils::normalize_email;

/// Issue a fresh access/refresh pair for `subject`.
pub(super) fn issue_token_pair(
    auth_state: &AuthState,
    subject: Uuid,
) -> Result<TokenPairResponse, TokenError> {
    let codec = auth_state.codec();
    Ok(TokenPairResponse {
        access_token: codec.issue(subject, TokenKind::Access)?,
        refresh_token: codec.issue(subject, TokenKind::Refresh)?,
        token_type: "Bearer".to_string(),
        expires_in: codec.access_ttl().num_seconds(),
    })
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted; token pair issued.", body = TokenPairResponse),
        (status = 401, description = "Unknown email or wrong password."),
        (status = 403, description = "Account is disabled."),
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let email = normalize_email(&payload.email);

    let user = match find_user_by_email(&pool, &email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user for login: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // One response for unknown email and wrong password: no account probing.
    let Some(user) = user else {
        return (StatusCode::UNAUTHORIZED, "Invalid email or password.").into_response();
    };
    if !verify_password(&payload.password, &user.password_hash) {
        return (StatusCode::UNAUTHORIZED, "Invalid email or password.").into_response();
    }

    if !user.is_active {
        return (StatusCode::FORBIDDEN, "Access denied.").into_response();
    }

    // The login itself already succeeded; a failed stamp only loses telemetry.
    if let Err(err) = touch_last_login(&pool, user.id).await {
        error!("Failed to stamp last login: {err}");
    }

    match issue_token_pair(&auth_state, user.id) {
        Ok(pair) => (StatusCode::OK, Json(pair)).into_response(),
        Err(err) => {
            error!("Failed to issue token pair: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
