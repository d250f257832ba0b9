//! Parking session endpoints.
//!
//! Customers open sessions against a venue; staff close them and review the
//! open list. Pricing and billing are out of scope; sessions only track who
//! parked where and when.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::{authorize, AuthState, Role};
use super::venues::find_venue_by_slug;

const PLATE_MAX: usize = 16;

#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenParkingRequest {
    pub plate: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParkingSessionResponse {
    pub id: String,
    pub venue_id: String,
    pub plate: String,
    pub status: String,
    pub started_at: String,
    pub ended_at: Option<String>,
}

const SESSION_COLUMNS: &str = "id, venue_id, plate, status, started_at, ended_at";

fn session_from_row(row: &sqlx::postgres::PgRow) -> ParkingSessionResponse {
    let id: Uuid = row.get("id");
    let venue_id: Uuid = row.get("venue_id");
    let started_at: DateTime<Utc> = row.get("started_at");
    let ended_at: Option<DateTime<Utc>> = row.get("ended_at");
    ParkingSessionResponse {
        id: id.to_string(),
        venue_id: venue_id.to_string(),
        plate: row.get("plate"),
        status: row.get("status"),
        started_at: started_at.to_rfc3339(),
        ended_at: ended_at.map(|at| at.to_rfc3339()),
    }
}

async fn insert_session(
    pool: &PgPool,
    venue_id: Uuid,
    user_id: Uuid,
    plate: &str,
) -> Result<ParkingSessionResponse> {
    let query = format!(
        r"
        INSERT INTO parking_sessions
            (venue_id, user_id, plate)
        VALUES ($1, $2, $3)
        RETURNING {SESSION_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(venue_id)
        .bind(user_id)
        .bind(plate)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to open parking session")?;
    Ok(session_from_row(&row))
}

/// Close an open session; `None` when unknown, `Some(None)` when already
/// closed.
async fn close_session(
    pool: &PgPool,
    session_id: Uuid,
) -> Result<Option<Option<ParkingSessionResponse>>> {
    let query = format!(
        r"
        UPDATE parking_sessions
        SET status = 'closed', ended_at = NOW()
        WHERE id = $1 AND status = 'open'
        RETURNING {SESSION_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(session_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to close parking session")?;

    if let Some(row) = row {
        return Ok(Some(Some(session_from_row(&row))));
    }

    // Distinguish "unknown id" from "already closed" for a precise status.
    let exists_query = "SELECT 1 FROM parking_sessions WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = exists_query
    );
    let exists = sqlx::query(exists_query)
        .bind(session_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check parking session")?;
    Ok(exists.map(|_| None))
}

async fn list_open_sessions(pool: &PgPool, venue_id: Uuid) -> Result<Vec<ParkingSessionResponse>> {
    let query = format!(
        "SELECT {SESSION_COLUMNS} FROM parking_sessions \
         WHERE venue_id = $1 AND status = 'open' ORDER BY started_at"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(venue_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list open parking sessions")?;
    Ok(rows.iter().map(session_from_row).collect())
}

fn normalize_plate(plate: &str) -> Option<String> {
    let plate: String = plate
        .trim()
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if plate.is_empty() || plate.chars().count() > PLATE_MAX {
        return None;
    }
    Some(plate)
}

#[utoipa::path(
    post,
    path = "/v1/venues/{venue_slug}/parking",
    params(("venue_slug" = String, Path, description = "Venue slug")),
    request_body = OpenParkingRequest,
    responses(
        (status = 201, description = "Parking session opened.", body = ParkingSessionResponse),
        (status = 400, description = "Invalid plate.", body = String),
        (status = 401, description = "Missing or invalid access token."),
        (status = 404, description = "Unknown venue."),
    ),
    tag = "parking"
)]
pub async fn open_parking(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(venue_slug): Path<String>,
    Json(payload): Json<OpenParkingRequest>,
) -> impl IntoResponse {
    let principal = match authorize(&headers, &pool, &auth_state, Role::Customer).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    let Some(plate) = normalize_plate(&payload.plate) else {
        return (StatusCode::BAD_REQUEST, "Invalid plate.").into_response();
    };

    let venue = match find_venue_by_slug(&pool, &venue_slug).await {
        Ok(Some(venue)) => venue,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch venue for parking: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match insert_session(&pool, venue.id, principal.id, &plate).await {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(err) => {
            error!("Failed to open parking session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/parking/{session_id}/close",
    params(("session_id" = String, Path, description = "Parking session id")),
    responses(
        (status = 200, description = "Session closed.", body = ParkingSessionResponse),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_staff."),
        (status = 404, description = "Unknown session."),
        (status = 409, description = "Session already closed.", body = String),
    ),
    tag = "parking"
)]
pub async fn close_parking(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(session_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::VenueStaff).await {
        return err.into_response();
    }

    match close_session(&pool, session_id).await {
        Ok(Some(Some(session))) => (StatusCode::OK, Json(session)).into_response(),
        Ok(Some(None)) => (StatusCode::CONFLICT, "Session already closed.").into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to close parking session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/venues/{venue_slug}/parking",
    params(("venue_slug" = String, Path, description = "Venue slug")),
    responses(
        (status = 200, description = "Open sessions at this venue.", body = [ParkingSessionResponse]),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_staff."),
        (status = 404, description = "Unknown venue."),
    ),
    tag = "parking"
)]
pub async fn list_parking(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(venue_slug): Path<String>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::VenueStaff).await {
        return err.into_response();
    }

    let venue = match find_venue_by_slug(&pool, &venue_slug).await {
        Ok(Some(venue)) => venue,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch venue for parking list: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match list_open_sessions(&pool, venue.id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list parking sessions: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_plate_uppercases_and_strips_spaces() {
        assert_eq!(normalize_plate(" ab 123 c "), Some("AB123C".to_string()));
    }

    #[test]
    fn normalize_plate_rejects_empty_and_oversized() {
        assert_eq!(normalize_plate("   "), None);
        assert_eq!(normalize_plate(&"A".repeat(17)), None);
    }
}
