//! User-facing error taxonomy for the auth endpoints.
//!
//! Token failures deliberately collapse into one generic `Unauthorized`
//! response; the real reason only reaches the logs. Internal errors never
//! leak detail across the boundary.

use axum::http::{header::RETRY_AFTER, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Wrong email or password; never says which.
    #[error("invalid email or password")]
    InvalidCredentials { remaining: Option<i64> },

    /// The account itself is blocked, not the attempt.
    #[error("account is blocked")]
    AccountBlocked,

    /// Brute-force guard tripped for this email or source address.
    #[error("too many failed login attempts")]
    BruteForceBlocked { retry_after: Duration },

    /// Missing, malformed, expired, forged, replayed, or mismatched token.
    #[error("invalid or expired token")]
    Unauthorized,

    #[error("too many requests")]
    RateLimited { retry_after: Duration },

    /// Rate limiting fails closed when its counter store is down.
    #[error("service unavailable")]
    ServiceUnavailable,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidCredentials { remaining } => {
                let mut body = json!({ "error": "Invalid email or password" });
                if let Some(remaining) = remaining {
                    body["remaining_attempts"] = json!(remaining);
                }
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            Self::AccountBlocked => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Account is blocked" })),
            )
                .into_response(),
            Self::BruteForceBlocked { retry_after } => {
                let minutes = retry_after.as_secs().div_ceil(60).max(1);
                let body = json!({
                    "error": format!("Too many failed attempts, try again in {minutes} minute(s)"),
                    "retry_after_seconds": retry_after.as_secs(),
                });
                with_retry_after(StatusCode::FORBIDDEN, retry_after, Json(body))
            }
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid or expired token" })),
            )
                .into_response(),
            Self::RateLimited { retry_after } => {
                let body = json!({
                    "error": "Too many requests",
                    "retry_after_seconds": retry_after.as_secs(),
                });
                with_retry_after(StatusCode::TOO_MANY_REQUESTS, retry_after, Json(body))
            }
            Self::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Service unavailable" })),
            )
                .into_response(),
            Self::Internal(err) => {
                error!("Internal auth error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}

fn with_retry_after(
    status: StatusCode,
    retry_after: Duration,
    body: Json<serde_json::Value>,
) -> Response {
    let mut response = (status, body).into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
        response.headers_mut().insert(RETRY_AFTER, value);
    }
    response
}
