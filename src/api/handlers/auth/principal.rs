//! Authenticated principal resolution and the per-request authorization
//! pipeline.
//!
//! Flow Overview: extract the bearer token, verify it as an access token,
//! resolve the subject to a user row, and enforce the active flag. Every
//! token or lookup failure collapses to one uniform 401 body so callers
//! cannot probe which sub-case occurred; the specific kind only reaches the
//! logs.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

use super::roles::{require_role, Role};
use super::state::AuthState;
use super::storage::find_user_by_id;
use super::token::{TokenError, TokenKind};
use super::utils::extract_bearer_token;

/// Authenticated user context derived from a verified access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub full_name: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("principal not found")]
    PrincipalNotFound,
    #[error("principal inactive")]
    PrincipalInactive,
    #[error("insufficient permissions")]
    InsufficientPermissions,
    #[error("auth backend failure")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::Token(_) | Self::PrincipalNotFound => {
                StatusCode::UNAUTHORIZED
            }
            Self::PrincipalInactive | Self::InsufficientPermissions => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Constant bodies per status class; which 401 sub-case fired is
        // log-only to keep token and account state unobservable.
        match self.status() {
            StatusCode::FORBIDDEN => {
                debug!("authorization denied: {self}");
                (StatusCode::FORBIDDEN, "Access denied.").into_response()
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("auth pipeline failure: {self:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.").into_response()
            }
            _ => {
                debug!("authentication rejected: {self}");
                (StatusCode::UNAUTHORIZED, "Authentication required.").into_response()
            }
        }
    }
}

/// Resolve the access token in `headers` to an active principal.
///
/// # Errors
/// Missing/invalid/expired tokens and unknown subjects are 401-class
/// failures; a disabled account is 403-class; a persistence failure
/// propagates as 500-class (identity resolution does not fail open).
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Principal, AuthError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::MissingToken)?;
    let claims = auth_state.codec().verify(&token, TokenKind::Access)?;

    let user = find_user_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::PrincipalNotFound)?;

    if !user.is_active {
        return Err(AuthError::PrincipalInactive);
    }

    Ok(Principal {
        id: user.id,
        email: user.email,
        role: user.role,
        full_name: user.full_name,
        is_active: user.is_active,
    })
}

/// Soft variant for endpoints with optional authentication: any failure of
/// the strict path, lookup errors included, degrades to anonymous.
pub async fn optional_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Option<Principal> {
    match require_auth(headers, pool, auth_state).await {
        Ok(principal) => Some(principal),
        Err(err) => {
            debug!("optional auth degraded to anonymous: {err}");
            None
        }
    }
}

/// The full per-request authorization pipeline: authenticate, then gate on a
/// minimum role.
///
/// # Errors
/// Propagates [`require_auth`] failures and
/// `AuthError::InsufficientPermissions` from the role gate.
pub async fn authorize(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    minimum: Role,
) -> Result<Principal, AuthError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    require_role(principal, minimum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(AuthError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Token(TokenError::Malformed).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Token(TokenError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Token(TokenError::TypeMismatch).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::PrincipalNotFound.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::PrincipalInactive.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::InsufficientPermissions.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::Internal(anyhow::anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized_body_is_uniform_across_sub_cases() {
        // Anti-enumeration: expired, malformed, and unknown-subject failures
        // must be indistinguishable at the HTTP boundary.
        let bodies: Vec<Response> = vec![
            AuthError::MissingToken.into_response(),
            AuthError::Token(TokenError::Malformed).into_response(),
            AuthError::Token(TokenError::Expired).into_response(),
            AuthError::PrincipalNotFound.into_response(),
        ];
        for response in bodies {
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
