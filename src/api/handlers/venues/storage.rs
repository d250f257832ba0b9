//! Database helpers for venues and events.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::super::auth::utils::is_unique_violation;
use super::types::{EventResponse, VenueResponse};

/// Internal venue row; handlers expose [`VenueResponse`].
pub(crate) struct VenueRecord {
    pub(crate) id: Uuid,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) address: Option<String>,
    pub(crate) timezone: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub(super) enum CreateVenueOutcome {
    Created(Uuid),
    SlugTaken,
}

impl VenueRecord {
    pub(crate) fn into_response(self) -> VenueResponse {
        VenueResponse {
            id: self.id.to_string(),
            slug: self.slug,
            name: self.name,
            address: self.address,
            timezone: self.timezone,
            is_active: self.is_active,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

const VENUE_COLUMNS: &str = "id, slug, name, address, timezone, is_active, created_at";

fn venue_from_row(row: &sqlx::postgres::PgRow) -> VenueRecord {
    VenueRecord {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        address: row.get("address"),
        timezone: row.get("timezone"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

pub(crate) async fn find_venue_by_slug(pool: &PgPool, slug: &str) -> Result<Option<VenueRecord>> {
    let query = format!("SELECT {VENUE_COLUMNS} FROM venues WHERE slug = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(slug)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup venue by slug")?;
    Ok(row.map(|row| venue_from_row(&row)))
}

/// List venues; `include_inactive` widens the result for admin callers.
pub(super) async fn list_venues(
    pool: &PgPool,
    include_inactive: bool,
) -> Result<Vec<VenueResponse>> {
    let query = format!(
        "SELECT {VENUE_COLUMNS} FROM venues WHERE is_active OR $1 ORDER BY name"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(include_inactive)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list venues")?;
    Ok(rows
        .iter()
        .map(|row| venue_from_row(row).into_response())
        .collect())
}

pub(super) async fn insert_venue(
    pool: &PgPool,
    slug: &str,
    name: &str,
    address: Option<&str>,
    timezone: &str,
) -> Result<CreateVenueOutcome> {
    let query = r"
        INSERT INTO venues
            (slug, name, address, timezone)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(slug)
        .bind(name)
        .bind(address)
        .bind(timezone)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(CreateVenueOutcome::Created(row.get("id"))),
        Err(err) => {
            if is_unique_violation(&err) {
                return Ok(CreateVenueOutcome::SlugTaken);
            }
            Err(err).context("failed to insert venue")
        }
    }
}

pub(super) async fn update_venue_record(
    pool: &PgPool,
    slug: &str,
    name: Option<&str>,
    address: Option<&str>,
    timezone: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<VenueRecord>> {
    let query = format!(
        r"
        UPDATE venues SET
            name = COALESCE($2, name),
            address = COALESCE($3, address),
            timezone = COALESCE($4, timezone),
            is_active = COALESCE($5, is_active),
            updated_at = NOW()
        WHERE slug = $1
        RETURNING {VENUE_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(slug)
        .bind(name)
        .bind(address)
        .bind(timezone)
        .bind(is_active)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update venue")?;
    Ok(row.map(|row| venue_from_row(&row)))
}

const EVENT_COLUMNS: &str = "id, venue_id, name, starts_at, ends_at, capacity, status";

fn event_from_row(row: &sqlx::postgres::PgRow) -> EventResponse {
    let id: Uuid = row.get("id");
    let venue_id: Uuid = row.get("venue_id");
    let starts_at: DateTime<Utc> = row.get("starts_at");
    let ends_at: DateTime<Utc> = row.get("ends_at");
    EventResponse {
        id: id.to_string(),
        venue_id: venue_id.to_string(),
        name: row.get("name"),
        starts_at: starts_at.to_rfc3339(),
        ends_at: ends_at.to_rfc3339(),
        capacity: row.get("capacity"),
        status: row.get("status"),
    }
}

pub(super) async fn list_events_for_venue(
    pool: &PgPool,
    venue_id: Uuid,
) -> Result<Vec<EventResponse>> {
    let query = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE venue_id = $1 ORDER BY starts_at"
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
        .context("failed to list events")?;
    Ok(rows.iter().map(event_from_row).collect())
}

pub(super) async fn insert_event(
    pool: &PgPool,
    venue_id: Uuid,
    name: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    capacity: i32,
) -> Result<EventResponse> {
    let query = format!(
        r"
        INSERT INTO events
            (venue_id, name, starts_at, ends_at, capacity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {EVENT_COLUMNS}
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
        .bind(name)
        .bind(starts_at)
        .bind(ends_at)
        .bind(capacity)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert event")?;
    Ok(event_from_row(&row))
}

/// Cancel an event; returns the fresh row, or `None` when the id is unknown.
pub(super) async fn cancel_event_record(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Option<EventResponse>> {
    let query = format!(
        r"
        UPDATE events SET status = 'cancelled', updated_at = NOW()
        WHERE id = $1
        RETURNING {EVENT_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(event_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to cancel event")?;
    Ok(row.map(|row| event_from_row(&row)))
}
