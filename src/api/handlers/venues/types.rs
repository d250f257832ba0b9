//! Request/response types for venue and event endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVenueRequest {
    pub name: String,
    pub slug: Option<String>,
    pub address: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateVenueRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VenueResponse {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub address: Option<String>,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub name: String,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    pub capacity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: String,
    pub venue_id: String,
    pub name: String,
    pub starts_at: String,
    pub ends_at: String,
    pub capacity: i32,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn create_venue_request_round_trips() -> Result<()> {
        let decoded: CreateVenueRequest =
            serde_json::from_str(r#"{"name":"Grand Arena","slug":"grand-arena"}"#)?;
        assert_eq!(decoded.name, "Grand Arena");
        assert_eq!(decoded.slug.as_deref(), Some("grand-arena"));
        assert_eq!(decoded.address, None);
        Ok(())
    }

    #[test]
    fn update_venue_request_rejects_unknown_fields() {
        let result = serde_json::from_str::<UpdateVenueRequest>(r#"{"slug":"nope"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn create_event_request_parses_timestamps() -> Result<()> {
        let decoded: CreateEventRequest = serde_json::from_str(
            r#"{"name":"Opening Night","starts_at":"2026-09-01T19:00:00Z","ends_at":"2026-09-01T23:00:00Z","capacity":1200}"#,
        )?;
        assert_eq!(decoded.capacity, 1200);
        assert!(decoded.ends_at > decoded.starts_at);
        Ok(())
    }
}
