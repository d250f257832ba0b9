//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn register_request_round_trips() -> Result<()> {
        let request = RegisterRequest {
            email: "alice@example.com".to_string(),
            password: "Secret123".to_string(),
            full_name: Some("Alice".to_string()),
            phone: None,
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: RegisterRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.full_name.as_deref(), Some("Alice"));
        Ok(())
    }

    #[test]
    fn login_request_accepts_minimal_payload() -> Result<()> {
        let decoded: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"Secret123"}"#)?;
        assert_eq!(decoded.email, "a@b.com");
        Ok(())
    }

    #[test]
    fn token_pair_response_shape() -> Result<()> {
        let response = TokenPairResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 1800,
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("token_type").and_then(serde_json::Value::as_str),
            Some("Bearer")
        );
        assert_eq!(
            value.get("expires_in").and_then(serde_json::Value::as_i64),
            Some(1800)
        );
        Ok(())
    }
}
