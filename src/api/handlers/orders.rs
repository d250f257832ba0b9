//! Concierge commerce orders.
//!
//! Customers place in-venue orders (food, merchandise, conveniences); staff
//! move them through a small status machine. Payment capture and fulfillment
//! logistics are out of scope.

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

use super::auth::{authorize, require_auth, AuthState, Role};
use super::venues::find_venue_by_slug;

const ORDER_STATUSES: &[&str] = &["placed", "preparing", "delivered", "cancelled"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    /// Free-form line items; the venue's catalog lives elsewhere.
    pub items: serde_json::Value,
    pub total_cents: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: String,
    pub venue_id: String,
    pub items: serde_json::Value,
    pub total_cents: i64,
    pub status: String,
    pub created_at: String,
}

const ORDER_COLUMNS: &str = "id, venue_id, items, total_cents, status, created_at";

fn order_from_row(row: &sqlx::postgres::PgRow) -> OrderResponse {
    let id: Uuid = row.get("id");
    let venue_id: Uuid = row.get("venue_id");
    let created_at: DateTime<Utc> = row.get("created_at");
    OrderResponse {
        id: id.to_string(),
        venue_id: venue_id.to_string(),
        items: row.get("items"),
        total_cents: row.get("total_cents"),
        status: row.get("status"),
        created_at: created_at.to_rfc3339(),
    }
}

async fn insert_order(
    pool: &PgPool,
    venue_id: Uuid,
    user_id: Uuid,
    items: &serde_json::Value,
    total_cents: i64,
) -> Result<OrderResponse> {
    let query = format!(
        r"
        INSERT INTO orders
            (venue_id, user_id, items, total_cents)
        VALUES ($1, $2, $3, $4)
        RETURNING {ORDER_COLUMNS}
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
        .bind(items)
        .bind(total_cents)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert order")?;
    Ok(order_from_row(&row))
}

async fn orders_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<OrderResponse>> {
    let query = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
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
        .context("failed to list orders")?;
    Ok(rows.iter().map(order_from_row).collect())
}

async fn set_order_status(
    pool: &PgPool,
    order_id: Uuid,
    status: &str,
) -> Result<Option<OrderResponse>> {
    let query = format!(
        r"
        UPDATE orders SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(order_id)
        .bind(status)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update order status")?;
    Ok(row.map(|row| order_from_row(&row)))
}

#[utoipa::path(
    post,
    path = "/v1/venues/{venue_slug}/orders",
    params(("venue_slug" = String, Path, description = "Venue slug")),
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed.", body = OrderResponse),
        (status = 400, description = "Invalid order payload.", body = String),
        (status = 401, description = "Missing or invalid access token."),
        (status = 404, description = "Unknown venue."),
    ),
    tag = "orders"
)]
pub async fn place_order(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(venue_slug): Path<String>,
    Json(payload): Json<PlaceOrderRequest>,
) -> impl IntoResponse {
    let principal = match authorize(&headers, &pool, &auth_state, Role::Customer).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    if !payload.items.is_array() || payload.items.as_array().is_some_and(Vec::is_empty) {
        return (StatusCode::BAD_REQUEST, "Order items are required.").into_response();
    }
    if payload.total_cents < 0 {
        return (StatusCode::BAD_REQUEST, "Order total must not be negative.").into_response();
    }

    let venue = match find_venue_by_slug(&pool, &venue_slug).await {
        Ok(Some(venue)) => venue,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch venue for order: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match insert_order(
        &pool,
        venue.id,
        principal.id,
        &payload.items,
        payload.total_cents,
    )
    .await
    {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(err) => {
            error!("Failed to place order: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/me/orders",
    responses(
        (status = 200, description = "Orders placed by the authenticated user.", body = [OrderResponse]),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "orders"
)]
pub async fn my_orders(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    match orders_for_user(&pool, principal.id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list orders: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/v1/orders/{order_id}/status",
    params(("order_id" = String, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated.", body = OrderResponse),
        (status = 400, description = "Unknown status value.", body = String),
        (status = 401, description = "Missing or invalid access token."),
        (status = 403, description = "Requires venue_staff."),
        (status = 404, description = "Unknown order."),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> impl IntoResponse {
    if let Err(err) = authorize(&headers, &pool, &auth_state, Role::VenueStaff).await {
        return err.into_response();
    }

    let status = payload.status.trim();
    if !ORDER_STATUSES.contains(&status) {
        return (StatusCode::BAD_REQUEST, "Unknown status value.").into_response();
    }

    match set_order_status(&pool, order_id, status).await {
        Ok(Some(order)) => (StatusCode::OK, Json(order)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update order status: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_values_are_known() {
        for status in ["placed", "preparing", "delivered", "cancelled"] {
            assert!(ORDER_STATUSES.contains(&status));
        }
        assert!(!ORDER_STATUSES.contains(&"refunded"));
    }

    #[test]
    fn update_status_request_rejects_unknown_fields() {
        let result = serde_json::from_str::<UpdateOrderStatusRequest>(
            r#"{"status":"placed","total_cents":0}"#,
        );
        assert!(result.is_err());
    }
}
