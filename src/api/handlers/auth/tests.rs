//! End-to-end auth flow tests.
//!
//! Token-only paths run everywhere (no database round trip happens before
//! the failure under test). Full register/login/me scenarios need a real
//! database and are skipped unless `INGRESSO_TEST_DSN` is set.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use chrono::Duration;
use secrecy::SecretString;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

use super::{
    optional_auth, require_auth, AuthConfig, AuthError, AuthState, NoopRateLimiter, TokenKind,
};

fn test_auth_state() -> Arc<AuthState> {
    Arc::new(AuthState::new(
        AuthConfig::new(),
        &SecretString::from("test-signing-secret".to_string()),
        Arc::new(NoopRateLimiter),
    ))
}

/// Pool that never connects; used by tests whose failure fires before any
/// database round trip.
fn lazy_pool() -> Result<PgPool> {
    PgPoolOptions::new()
        .connect_lazy("postgres://ingresso@localhost:5432/ingresso")
        .context("failed to build lazy pool")
}

fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    Ok(headers)
}

#[tokio::test]
async fn optional_auth_swallows_every_failure() -> Result<()> {
    let pool = lazy_pool()?;
    let auth_state = test_auth_state();

    // Absent token.
    assert!(optional_auth(&HeaderMap::new(), &pool, &auth_state)
        .await
        .is_none());

    // Malformed token must degrade to anonymous, not propagate.
    let headers = bearer_headers("not-a-real-token")?;
    assert!(optional_auth(&headers, &pool, &auth_state).await.is_none());

    // Expired token.
    let expired = auth_state.codec().issue_with_ttl(
        Uuid::new_v4(),
        TokenKind::Access,
        Duration::seconds(-1),
    )?;
    let headers = bearer_headers(&expired)?;
    assert!(optional_auth(&headers, &pool, &auth_state).await.is_none());

    Ok(())
}

#[tokio::test]
async fn require_auth_rejects_refresh_tokens() -> Result<()> {
    let pool = lazy_pool()?;
    let auth_state = test_auth_state();

    let refresh = auth_state
        .codec()
        .issue(Uuid::new_v4(), TokenKind::Refresh)?;
    let headers = bearer_headers(&refresh)?;

    let err = require_auth(&headers, &pool, &auth_state)
        .await
        .expect_err("refresh token must not authenticate");
    assert!(matches!(
        err,
        AuthError::Token(super::TokenError::TypeMismatch)
    ));
    Ok(())
}

#[tokio::test]
async fn require_auth_rejects_missing_and_garbage_tokens() -> Result<()> {
    let pool = lazy_pool()?;
    let auth_state = test_auth_state();

    let err = require_auth(&HeaderMap::new(), &pool, &auth_state)
        .await
        .expect_err("missing token must not authenticate");
    assert!(matches!(err, AuthError::MissingToken));

    let headers = bearer_headers("garbage")?;
    let err = require_auth(&headers, &pool, &auth_state)
        .await
        .expect_err("garbage token must not authenticate");
    assert!(matches!(err, AuthError::Token(_)));
    Ok(())
}

async fn scenario_pool() -> Result<Option<PgPool>> {
    let Ok(dsn) = std::env::var("INGRESSO_TEST_DSN") else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&dsn)
        .await
        .context("failed to connect to test database")?;
    Ok(Some(pool))
}

#[tokio::test]
async fn register_login_me_round_trip() -> Result<()> {
    let Some(pool) = scenario_pool().await? else {
        eprintln!("Skipping integration test: INGRESSO_TEST_DSN not set");
        return Ok(());
    };
    let auth_state = test_auth_state();
    let app = crate::api::app(pool, auth_state);

    let email = format!("scenario-{}@example.com", Uuid::new_v4());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json!({
                    "email": email,
                    "password": "Secret123",
                }))?))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json!({
                    "email": email,
                    "password": "Secret123",
                }))?))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let tokens: serde_json::Value = serde_json::from_slice(&body)?;
    let access = tokens
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .context("missing access_token")?;
    let refresh = tokens
        .get("refresh_token")
        .and_then(serde_json::Value::as_str)
        .context("missing refresh_token")?;

    // The access token authenticates /v1/me and resolves to the same account.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/me")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let profile: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(
        profile.get("email").and_then(serde_json::Value::as_str),
        Some(email.as_str())
    );

    // The refresh token must not pass where an access token is required.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/me")
                .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The refresh endpoint accepts it and hands back a fresh pair.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json!({
                    "refresh_token": refresh,
                }))?))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let rotated: serde_json::Value = serde_json::from_slice(&body)?;
    assert!(rotated.get("access_token").is_some());
    assert!(rotated.get("refresh_token").is_some());

    Ok(())
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email_alike() -> Result<()> {
    let Some(pool) = scenario_pool().await? else {
        eprintln!("Skipping integration test: INGRESSO_TEST_DSN not set");
        return Ok(());
    };
    let auth_state = test_auth_state();
    let app = crate::api::app(pool, auth_state);

    let email = format!("scenario-{}@example.com", Uuid::new_v4());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json!({
                    "email": email,
                    "password": "Secret123",
                }))?))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut bodies = Vec::new();
    for payload in [
        json!({"email": email, "password": "WrongPassword"}),
        json!({"email": format!("nobody-{}@example.com", Uuid::new_v4()), "password": "Secret123"}),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&payload)?))?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        bodies.push(axum::body::to_bytes(response.into_body(), usize::MAX).await?);
    }
    // Anti-enumeration: the two failures are indistinguishable.
    assert_eq!(bodies[0], bodies[1]);

    Ok(())
}
