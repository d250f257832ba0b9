//! Event handlers scoped to a venue.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::super::auth::{authorize, AuthState, Role};
use super::storage::{
    cancel_event_record, find_venue_by_slug, insert_event, list_events_for_venue,
};
use super::types::{CreateEventRequest, EventResponse};

#[utoipa::path(
    get,
    path = "/v1/venues/{venue_slug}/events",
    params(("venue_slug" = String, Path, description = "Venue slug")),
    responses(
        (status = 200, description = "Events at this venue.", body = [EventResponse]),
        (status = 404, description = "Unknown venue."),
    ),
    tag = "venues"
)]
pub async fn list_events(
    pool: Extension<PgPool>,
    Path(venue_slug): Path<String>,
) -> impl IntoResponse {
    let venue = match find_venue_by_slug(&pool, &venue_slug).await {
        Ok(Some(venue)) => venue,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch venue for events: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match list_events_for_venue(&pool, venue.id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list events: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/venues/{venue_slug}/events",
    params(("venue_slug" = String, Path, description = "Venue slug")),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created.", body = EventResponse),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_admin."),
        (status = 404, description = "Unknown venue."),
    ),
    tag = "venues"
)]
pub async fn create_event(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(venue_slug): Path<String>,
    Json(payload): Json<CreateEventRequest>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::VenueAdmin).await {
        return err.into_response();
    }

    let name = payload.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Event name is required.").into_response();
    }
    if payload.ends_at <= payload.starts_at {
        return (StatusCode::BAD_REQUEST, "Event must end after it starts.").into_response();
    }
    if payload.capacity <= 0 {
        return (StatusCode::BAD_REQUEST, "Capacity must be positive.").into_response();
    }

    let venue = match find_venue_by_slug(&pool, &venue_slug).await {
        Ok(Some(venue)) => venue,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch venue for event creation: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match insert_event(
        &pool,
        venue.id,
        name,
        payload.starts_at,
        payload.ends_at,
        payload.capacity,
    )
    .await
    {
        Ok(event) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(err) => {
            error!("Failed to create event: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/events/{event_id}/cancel",
    params(("event_id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event cancelled.", body = EventResponse),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_admin."),
        (status = 404, description = "Unknown event."),
    ),
    tag = "venues"
)]
pub async fn cancel_event(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(event_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::VenueAdmin).await {
        return err.into_response();
    }

    match cancel_event_record(&pool, event_id).await {
        Ok(Some(event)) => (StatusCode::OK, Json(event)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to cancel event: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
