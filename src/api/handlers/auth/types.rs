//! Request/response types for the auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Sanitized user returned on login; the password hash never leaves the
/// storage boundary.
#[derive(Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub user: UserResponse,
}

/// One active session, projected to client-safe metadata.
#[derive(Serialize, Deserialize, Debug)]
pub struct SessionInfo {
    pub id: Uuid,
    pub jti: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub current: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionInfo>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RevokeSessionRequest {
    pub jti: Uuid,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.password, "hunter2hunter2");
        Ok(())
    }

    #[test]
    fn session_info_omits_absent_metadata() -> Result<()> {
        let info = SessionInfo {
            id: Uuid::nil(),
            jti: Uuid::nil(),
            created_at: Utc::now(),
            expires_at: Utc::now(),
            user_agent: None,
            ip: None,
            current: false,
        };
        let value = serde_json::to_value(&info)?;
        assert!(value.get("user_agent").is_none());
        assert!(value.get("ip").is_none());
        Ok(())
    }

    #[test]
    fn user_response_has_no_password_field() -> Result<()> {
        let user = UserResponse {
            id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            role: "user".to_string(),
        };
        let value = serde_json::to_value(&user)?;
        assert!(value.get("password_hash").is_none());
        assert!(value.get("password").is_none());
        Ok(())
    }
}
