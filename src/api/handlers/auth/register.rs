//! Account registration.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use tracing::error;

use super::password::hash_password;
use super::storage::{insert_user, SignupOutcome};
use super::types::{RegisterRequest, RegisterResponse};
use super::utils::{normalize_email, valid_email, valid_password};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created.", body = RegisterResponse),
        (status = 400, description = "Invalid email or password.", body = String),
        (status = 409, description = "Email or phone already registered.", body = String),
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let email = normalize_email(&payload.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email address.").into_response();
    }
    if !valid_password(&payload.password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters.",
        )
            .into_response();
    }

    let full_name = normalize_optional(payload.full_name);
    let phone = normalize_optional(payload.phone);

    let password_hash = match hash_password(&payload.password) {
        Ok(digest) => digest,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match insert_user(
        &pool,
        &email,
        &password_hash,
        full_name.as_deref(),
        phone.as_deref(),
    )
    .await
    {
        Ok(SignupOutcome::Created(id)) => {
            let response = RegisterResponse {
                id: id.to_string(),
                email,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Ok(SignupOutcome::Conflict) => (
            StatusCode::CONFLICT,
            "Email or phone already registered.",
        )
            .into_response(),
        Err(err) => {
            error!("Failed to register user: {err}");
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
    fn normalize_optional_drops_blank_values() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional(Some(" Alice ".to_string())),
            Some("Alice".to_string())
        );
    }
}
