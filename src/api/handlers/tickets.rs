//! Ticket issuance and check-in.
//!
//! Tickets carry a ULID code printed on the pass; check-in flips the status
//! exactly once. Inventory management and pricing are out of scope.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, Instrument};
use ulid::Ulid;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::{authorize, require_auth, AuthState, Role};

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketResponse {
    pub id: String,
    pub event_id: String,
    pub code: String,
    pub status: String,
    pub issued_at: String,
    pub checked_in_at: Option<String>,
}

const TICKET_COLUMNS: &str = "id, event_id, code, status, issued_at, checked_in_at";

fn ticket_from_row(row: &sqlx::postgres::PgRow) -> TicketResponse {
    let id: Uuid = row.get("id");
    let event_id: Uuid = row.get("event_id");
    let issued_at: DateTime<Utc> = row.get("issued_at");
    let checked_in_at: Option<DateTime<Utc>> = row.get("checked_in_at");
    TicketResponse {
        id: id.to_string(),
        event_id: event_id.to_string(),
        code: row.get("code"),
        status: row.get("status"),
        issued_at: issued_at.to_rfc3339(),
        checked_in_at: checked_in_at.map(|at| at.to_rfc3339()),
    }
}

/// Event must exist and still be scheduled for a ticket to be issued.
async fn event_is_scheduled(pool: &PgPool, event_id: Uuid) -> Result<Option<bool>> {
    let query = "SELECT status FROM events WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(event_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch event status")?;
    Ok(row.map(|row| row.get::<String, _>("status") == "scheduled"))
}

async fn insert_ticket(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    code: &str,
) -> Result<TicketResponse> {
    let query = format!(
        r"
        INSERT INTO tickets
            (event_id, user_id, code)
        VALUES ($1, $2, $3)
        RETURNING {TICKET_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(event_id)
        .bind(user_id)
        .bind(code)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert ticket")?;
    Ok(ticket_from_row(&row))
}

async fn tickets_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<TicketResponse>> {
    let query = format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = $1 ORDER BY issued_at DESC"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list tickets")?;
    Ok(rows.iter().map(ticket_from_row).collect())
}

/// Check a ticket in by code; `None` when unknown, `Some(None)` when the
/// ticket is not in `issued` state.
async fn check_in_ticket(pool: &PgPool, code: &str) -> Result<Option<Option<TicketResponse>>> {
    let query = format!(
        r"
        UPDATE tickets
        SET status = 'checked_in', checked_in_at = NOW()
        WHERE code = $1 AND status = 'issued'
        RETURNING {TICKET_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(code)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check in ticket")?;

    if let Some(row) = row {
        return Ok(Some(Some(ticket_from_row(&row))));
    }

    let exists_query = "SELECT 1 FROM tickets WHERE code = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = exists_query
    );
    let exists = sqlx::query(exists_query)
        .bind(code)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check ticket existence")?;
    Ok(exists.map(|_| None))
}

#[utoipa::path(
    post,
    path = "/v1/events/{event_id}/tickets",
    params(("event_id" = String, Path, description = "Event id")),
    responses(
        (status = 201, description = "Ticket issued.", body = TicketResponse),
        (status = 401, description = "Missing or invalid access token."),
        (status = 404, description = "Unknown event."),
        (status = 409, description = "Event is not open for ticketing.", body = String),
    ),
    tag = "tickets"
)]
pub async fn issue_ticket(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(event_id): Path<Uuid>,
) -> impl IntoResponse {
    let principal = match authorize(&headers, &pool, &auth_state, Role::Customer).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    match event_is_scheduled(&pool, event_id).await {
        Ok(Some(true)) => {}
        Ok(Some(false)) => {
            return (StatusCode::CONFLICT, "Event is not open for ticketing.").into_response();
        }
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch event for ticketing: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let code = Ulid::new().to_string();
    match insert_ticket(&pool, event_id, principal.id, &code).await {
        Ok(ticket) => (StatusCode::CREATED, Json(ticket)).into_response(),
        Err(err) => {
            error!("Failed to issue ticket: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/me/tickets",
    responses(
        (status = 200, description = "Tickets held by the authenticated user.", body = [TicketResponse]),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "tickets"
)]
pub async fn my_tickets(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    match tickets_for_user(&pool, principal.id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list tickets: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/tickets/{code}/check-in",
    params(("code" = String, Path, description = "Ticket code")),
    responses(
        (status = 200, description = "Ticket checked in.", body = TicketResponse),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_staff."),
        (status = 404, description = "Unknown ticket code."),
        (status = 409, description = "Ticket already used or void.", body = String),
    ),
    tag = "tickets"
)]
pub async fn check_in(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::VenueStaff).await {
        return err.into_response();
    }

    match check_in_ticket(&pool, &code).await {
        Ok(Some(Some(ticket))) => (StatusCode::OK, Json(ticket)).into_response(),
        Ok(Some(None)) => (StatusCode::CONFLICT, "Ticket already used or void.").into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to check in ticket: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
