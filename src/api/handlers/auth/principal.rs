//! Authenticated principal extraction.
//!
//! The principal is resolved explicitly per request from the access-token
//! cookie (or a bearer header) and passed into handlers; there is no
//! request-local magic to reach into.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use uuid::Uuid;

use super::cookies::{self, ACCESS_COOKIE};
use super::error::AuthError;
use super::tokens::TokenCodec;

/// Authenticated user context derived from a verified access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

/// Resolve the access token into a principal, or fail unauthorized.
pub fn require_auth(headers: &HeaderMap, codec: &TokenCodec) -> Result<Principal, AuthError> {
    let token = extract_access_token(headers).ok_or(AuthError::Unauthorized)?;
    let claims = codec.verify_access(&token)?;
    Ok(Principal {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    cookies::extract_cookie(headers, ACCESS_COOKIE)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
