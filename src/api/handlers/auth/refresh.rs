//! Access token renewal from a refresh token.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error};

use super::login::issue_token_pair;
use super::state::AuthState;
use super::storage::find_user_by_id;
use super::token::TokenKind;
use super::types::{RefreshRequest, TokenPairResponse};

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refresh token accepted; new token pair issued.", body = TokenPairResponse),
        (status = 401, description = "Missing, invalid, or expired refresh token."),
        (status = 403, description = "Account is disabled."),
    ),
    tag = "auth"
)]
pub async fn refresh(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<RefreshRequest>,
) -> impl IntoResponse {
    // An access token presented here fails the type check inside verify.
    let claims = match auth_state
        .codec()
        .verify(&payload.refresh_token, TokenKind::Refresh)
    {
        Ok(claims) => claims,
        Err(err) => {
            debug!("refresh token rejected: {err}");
            return (StatusCode::UNAUTHORIZED, "Authentication required.").into_response();
        }
    };

    // Re-check the subject: the account may have been deleted or disabled
    // since the refresh token was issued.
    let user = match find_user_by_id(&pool, claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, "Authentication required.").into_response();
        }
        Err(err) => {
            error!("Failed to lookup user for refresh: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !user.is_active {
        return (StatusCode::FORBIDDEN, "Access denied.").into_response();
    }

    match issue_token_pair(&auth_state, user.id) {
        Ok(pair) => (StatusCode::OK, Json(pair)).into_response(),
        Err(err) => {
            error!("Failed to issue token pair: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
