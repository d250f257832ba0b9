//! Partner opportunity endpoints.
//!
//! Opportunities are commercial openings (sponsorships, pop-up slots,
//! cross-venue promotions) published by platform operators. Venue admins
//! browse them and register interest; `super_admin` curates the list.

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

use super::auth::utils::is_unique_violation;
use super::auth::{authorize, AuthState, Role};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOpportunityRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterInterestRequest {
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OpportunityResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
}

const OPPORTUNITY_COLUMNS: &str = "id, title, description, status, created_at";

fn opportunity_from_row(row: &sqlx::postgres::PgRow) -> OpportunityResponse {
    let id: Uuid = row.get("id");
    let created_at: DateTime<Utc> = row.get("created_at");
    OpportunityResponse {
        id: id.to_string(),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        created_at: created_at.to_rfc3339(),
    }
}

async fn list_open_opportunities(pool: &PgPool) -> Result<Vec<OpportunityResponse>> {
    let query = format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
         WHERE status = 'open' ORDER BY created_at DESC"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list opportunities")?;
    Ok(rows.iter().map(opportunity_from_row).collect())
}

async fn insert_opportunity(
    pool: &PgPool,
    title: &str,
    description: &str,
    created_by: Uuid,
) -> Result<OpportunityResponse> {
    let query = format!(
        r"
        INSERT INTO opportunities
            (title, description, created_by)
        VALUES ($1, $2, $3)
        RETURNING {OPPORTUNITY_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(title)
        .bind(description)
        .bind(created_by)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert opportunity")?;
    Ok(opportunity_from_row(&row))
}

#[derive(Debug)]
enum InterestOutcome {
    Registered,
    Duplicate,
    UnknownOpportunity,
}

async fn insert_interest(
    pool: &PgPool,
    opportunity_id: Uuid,
    user_id: Uuid,
    note: Option<&str>,
) -> Result<InterestOutcome> {
    let exists_query = "SELECT 1 FROM opportunities WHERE id = $1 AND status = 'open'";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = exists_query
    );
    let exists = sqlx::query(exists_query)
        .bind(opportunity_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check opportunity")?;
    if exists.is_none() {
        return Ok(InterestOutcome::UnknownOpportunity);
    }

    let query = r"
        INSERT INTO opportunity_interests
            (opportunity_id, user_id, note)
        VALUES ($1, $2, $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(opportunity_id)
        .bind(user_id)
        .bind(note)
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(InterestOutcome::Registered),
        Err(err) => {
            if is_unique_violation(&err) {
                return Ok(InterestOutcome::Duplicate);
            }
            Err(err).context("failed to register interest")
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/opportunities",
    responses(
        (status = 200, description = "Open partner opportunities.", body = [OpportunityResponse]),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_admin."),
    ),
    tag = "opportunities"
)]
pub async fn list_opportunities(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::VenueAdmin).await {
        return err.into_response();
    }

    match list_open_opportunities(&pool).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list opportunities: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/opportunities",
    request_body = CreateOpportunityRequest,
    responses(
        (status = 201, description = "Opportunity published.", body = OpportunityResponse),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires super_admin."),
    ),
    tag = "opportunities"
)]
pub async fn create_opportunity(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<CreateOpportunityRequest>,
) -> impl IntoResponse {
    let principal = match authorize(&headers, &pool, &auth_state, Role::SuperAdmin).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    let title = payload.title.trim();
    let description = payload.description.trim();
    if title.is_empty() || description.is_empty() {
        return (StatusCode::BAD_REQUEST, "Title and description are required.").into_response();
    }

    match insert_opportunity(&pool, title, description, principal.id).await {
        Ok(opportunity) => (StatusCode::CREATED, Json(opportunity)).into_response(),
        Err(err) => {
            error!("Failed to create opportunity: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/opportunities/{opportunity_id}/interest",
    params(("opportunity_id" = String, Path, description = "Opportunity id")),
    request_body = RegisterInterestRequest,
    responses(
        (status = 204, description = "Interest registered."),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_admin."),
        (status = 404, description = "Unknown or closed opportunity."),
        (status = 409, description = "Interest already registered.", body = String),
    ),
    tag = "opportunities"
)]
pub async fn register_interest(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(opportunity_id): Path<Uuid>,
    Json(payload): Json<RegisterInterestRequest>,
) -> impl IntoResponse {
    let principal = match authorize(&headers, &pool, &auth_state, Role::VenueAdmin).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    let note = payload
        .note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty());

    match insert_interest(&pool, opportunity_id, principal.id, note).await {
        Ok(InterestOutcome::Registered) => StatusCode::NO_CONTENT.into_response(),
        Ok(InterestOutcome::Duplicate) => {
            (StatusCode::CONFLICT, "Interest already registered.").into_response()
        }
        Ok(InterestOutcome::UnknownOpportunity) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to register interest: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
