//! Venue CRUD handlers.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::super::auth::roles::role_rank;
use super::super::auth::{authorize, optional_auth, AuthState, Role};
use super::slug::normalize_slug;
use super::storage::{
    find_venue_by_slug, insert_venue, list_venues as list_venue_rows, update_venue_record,
    CreateVenueOutcome,
};
use super::types::{CreateVenueRequest, UpdateVenueRequest, VenueResponse};
use super::{VENUE_SLUG_MAX, VENUE_SLUG_MIN};

const DEFAULT_TIMEZONE: &str = "UTC";

#[utoipa::path(
    get,
    path = "/v1/venues",
    responses(
        (status = 200, description = "List venues. Anonymous callers see active venues; venue admins also see inactive ones.", body = [VenueResponse]),
    ),
    tag = "venues"
)]
pub async fn list_venues(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Optional auth: any failure just narrows the listing to active venues.
    let include_inactive = optional_auth(&headers, &pool, &auth_state)
        .await
        .is_some_and(|principal| role_rank(&principal.role) >= Role::VenueAdmin.rank());

    match list_venue_rows(&pool, include_inactive).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list venues: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/venues",
    request_body = CreateVenueRequest,
    responses(
        (status = 201, description = "Venue created.", body = VenueResponse),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires super_admin."),
        (status = 409, description = "Venue slug already exists.", body = String),
    ),
    tag = "venues"
)]
pub async fn create_venue(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<CreateVenueRequest>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::SuperAdmin).await {
        return err.into_response();
    }

    let name = payload.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Venue name is required.").into_response();
    }

    let base = payload.slug.as_deref().unwrap_or(name);
    let Some(slug) = normalize_slug(base, VENUE_SLUG_MIN, VENUE_SLUG_MAX) else {
        return (StatusCode::BAD_REQUEST, "Invalid venue slug.").into_response();
    };

    let timezone = payload
        .timezone
        .as_deref()
        .map(str::trim)
        .filter(|tz| !tz.is_empty())
        .unwrap_or(DEFAULT_TIMEZONE);

    match insert_venue(&pool, &slug, name, payload.address.as_deref(), timezone).await {
        Ok(CreateVenueOutcome::Created(_)) => match find_venue_by_slug(&pool, &slug).await {
            Ok(Some(venue)) => (StatusCode::CREATED, Json(venue.into_response())).into_response(),
            Ok(None) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Err(err) => {
                error!("Failed to reload created venue: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(CreateVenueOutcome::SlugTaken) => {
            (StatusCode::CONFLICT, "Venue slug already exists.").into_response()
        }
        Err(err) => {
            error!("Failed to create venue: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/venues/{venue_slug}",
    params(("venue_slug" = String, Path, description = "Venue slug")),
    responses(
        (status = 200, description = "Venue detail.", body = VenueResponse),
        (status = 404, description = "Unknown venue."),
    ),
    tag = "venues"
)]
pub async fn get_venue(pool: Extension<PgPool>, Path(venue_slug): Path<String>) -> impl IntoResponse {
    match find_venue_by_slug(&pool, &venue_slug).await {
        Ok(Some(venue)) => (StatusCode::OK, Json(venue.into_response())).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch venue: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/v1/venues/{venue_slug}",
    params(("venue_slug" = String, Path, description = "Venue slug")),
    request_body = UpdateVenueRequest,
    responses(
        (status = 200, description = "Venue updated.", body = VenueResponse),
        (status = 400, description = "Invalid update payload.", body = String),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_admin."),
        (status = 404, description = "Unknown venue."),
    ),
    tag = "venues"
)]
pub async fn update_venue(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(venue_slug): Path<String>,
    Json(payload): Json<UpdateVenueRequest>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::VenueAdmin).await {
        return err.into_response();
    }

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let address = payload
        .address
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let timezone = payload
        .timezone
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if name.is_none() && address.is_none() && timezone.is_none() && payload.is_active.is_none() {
        return (StatusCode::BAD_REQUEST, "No updates provided.").into_response();
    }

    match update_venue_record(&pool, &venue_slug, name, address, timezone, payload.is_active).await
    {
        Ok(Some(venue)) => (StatusCode::OK, Json(venue.into_response())).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update venue: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
