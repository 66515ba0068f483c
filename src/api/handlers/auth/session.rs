//! Refresh-session endpoints: rotation, logout, listing, revocation.
//!
//! Every unauthorized outcome on the refresh path shares one generic body;
//! whether the token was expired, forged, replayed, or mismatched is only
//! distinguishable in the audit log.

use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use super::audit::{self, AuditEvent};
use super::cookies::{clear_token_cookies, extract_cookie, set_token_cookies, REFRESH_COOKIE};
use super::error::AuthError;
use super::login::issue_session;
use super::principal::require_auth;
use super::sessions::hash_refresh_token;
use super::state::AuthState;
use super::storage;
use super::types::{MessageResponse, RevokeSessionRequest, SessionInfo, SessionListResponse};
use super::utils::{extract_client_ip, extract_user_agent};

/// Rotate a refresh token: consume the presented session and issue a new
/// lineage member with a fresh `jti`.
pub async fn refresh(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let token = extract_cookie(&headers, REFRESH_COOKIE).ok_or(AuthError::Unauthorized)?;
    let claims = state.codec().verify_refresh(&token)?;

    // Fast path: a replay of a known-revoked token never reaches the store.
    if state.sessions().is_revoked(claims.jti).await {
        audit::emit(&AuditEvent::RefreshRejected {
            user_id: Some(claims.sub),
            jti: Some(claims.jti),
            reason: "denylisted jti".to_string(),
        });
        return Err(AuthError::Unauthorized);
    }

    let user = storage::lookup_user_by_id(&pool, claims.sub)
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;
    let Some(user) = user else {
        audit::emit(&AuditEvent::RefreshRejected {
            user_id: Some(claims.sub),
            jti: Some(claims.jti),
            reason: "unknown user".to_string(),
        });
        return Err(AuthError::Unauthorized);
    };
    if user.is_blocked {
        return Err(AuthError::AccountBlocked);
    }

    let session = state
        .sessions()
        .find_session(claims.jti, user.id)
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;
    let Some(session) = session else {
        // Valid signature but no session here: never issued by us or
        // already pruned. Denylist the jti so resubmission stays blocked
        // for the token's remaining lifetime.
        let ttl = state
            .codec()
            .ttl_remaining(&token)
            .unwrap_or(Duration::from_secs(1));
        state.sessions().mark_revoked_in_cache(claims.jti, ttl).await;
        audit::emit(&AuditEvent::RefreshRejected {
            user_id: Some(user.id),
            jti: Some(claims.jti),
            reason: "no session record".to_string(),
        });
        return Err(AuthError::Unauthorized);
    };

    // All three must hold at once; any one failing kills the session.
    let hash_matches = session.token_hash == hash_refresh_token(&token);
    if !session.is_active() || !hash_matches {
        state
            .sessions()
            .revoke_and_cache(&session)
            .await
            .map_err(|err| AuthError::Internal(err.into()))?;
        audit::emit(&AuditEvent::RefreshRejected {
            user_id: Some(user.id),
            jti: Some(claims.jti),
            reason: if hash_matches {
                "session revoked or expired".to_string()
            } else {
                "token hash mismatch".to_string()
            },
        });
        return Err(AuthError::Unauthorized);
    }

    // Rotation: the presented session is single-use. The conditional durable
    // revoke decides the race; whichever concurrent refresh loses it stops
    // here instead of minting a second lineage.
    let consumed = state
        .sessions()
        .revoke_and_cache(&session)
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;
    if !consumed {
        audit::emit(&AuditEvent::RefreshRejected {
            user_id: Some(user.id),
            jti: Some(claims.jti),
            reason: "session already consumed".to_string(),
        });
        return Err(AuthError::Unauthorized);
    }

    let ip = extract_client_ip(&headers);
    let user_agent = extract_user_agent(&headers);
    let issued = issue_session(&state, &user, user_agent, ip).await?;

    audit::emit(&AuditEvent::SessionRotated {
        user_id: user.id,
        old_jti: session.jti,
        new_jti: issued.jti,
    });

    let mut response_headers = HeaderMap::new();
    set_token_cookies(
        &mut response_headers,
        state.config().cookie_options(),
        &issued.access_token,
        &issued.refresh_token,
    )
    .map_err(|err| AuthError::Internal(anyhow::anyhow!("token cookie: {err}")))?;
    Ok((StatusCode::NO_CONTENT, response_headers).into_response())
}

/// End the presented session. Cookies are cleared no matter what the
/// cookie contained.
pub async fn logout(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> Response {
    if let Some(token) = extract_cookie(&headers, REFRESH_COOKIE) {
        // Lenient decode: an expired token still names a session worth
        // revoking. Failures are fine; logout never errors.
        if let Some(claims) = state.codec().decode_refresh_lenient(&token) {
            match state.sessions().find_session(claims.jti, claims.sub).await {
                Ok(Some(session)) => match state.sessions().revoke_and_cache(&session).await {
                    Ok(true) => audit::emit(&AuditEvent::SessionRevoked {
                        user_id: claims.sub,
                        jti: claims.jti,
                    }),
                    Ok(false) => {}
                    Err(err) => tracing::warn!("Failed to revoke session on logout: {err}"),
                },
                Ok(None) => {}
                Err(err) => tracing::warn!("Session lookup failed on logout: {err}"),
            }
        }
    }

    let mut response_headers = HeaderMap::new();
    clear_token_cookies(&mut response_headers, state.config().cookie_options());
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Revoke every active session of the authenticated user.
pub async fn logout_all(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let principal = require_auth(&headers, state.codec())?;
    let count = state
        .sessions()
        .revoke_all(principal.user_id)
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;
    audit::emit(&AuditEvent::SessionsRevokedAll {
        user_id: principal.user_id,
        count,
    });

    let mut response_headers = HeaderMap::new();
    clear_token_cookies(&mut response_headers, state.config().cookie_options());
    let body = MessageResponse {
        message: format!("Revoked {count} session(s)"),
    };
    Ok((StatusCode::OK, response_headers, Json(body)).into_response())
}

/// List the authenticated user's active sessions, newest first, marking at
/// most one as current.
pub async fn list_sessions(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let principal = require_auth(&headers, state.codec())?;

    let current_jti = extract_cookie(&headers, REFRESH_COOKIE)
        .and_then(|token| state.codec().decode_refresh_lenient(&token))
        .filter(|claims| claims.sub == principal.user_id)
        .map(|claims| claims.jti);

    let rows = state
        .sessions()
        .list_sessions(principal.user_id)
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;
    let sessions = rows
        .into_iter()
        .map(|row| SessionInfo {
            id: row.id,
            jti: row.jti,
            created_at: row.created_at,
            expires_at: row.expires_at,
            user_agent: row.user_agent,
            ip: row.ip,
            current: current_jti == Some(row.jti),
        })
        .collect();
    Ok(Json(SessionListResponse { sessions }).into_response())
}

/// Revoke one session by `jti`. Revocation is "make it so": an absent or
/// already-revoked session is reported, not failed.
pub async fn revoke_session(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
    payload: Option<Json<RevokeSessionRequest>>,
) -> Result<Response, AuthError> {
    let principal = require_auth(&headers, state.codec())?;
    let Some(Json(request)) = payload else {
        return Ok((StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response());
    };

    let session = state
        .sessions()
        .find_session(request.jti, principal.user_id)
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;
    let message = match session {
        Some(session) if session.revoked_at.is_none() => {
            if state
                .sessions()
                .revoke_and_cache(&session)
                .await
                .map_err(|err| AuthError::Internal(err.into()))?
            {
                audit::emit(&AuditEvent::SessionRevoked {
                    user_id: principal.user_id,
                    jti: session.jti,
                });
                "Session revoked".to_string()
            } else {
                "Session already revoked".to_string()
            }
        }
        Some(_) => "Session already revoked".to_string(),
        None => "No such session; nothing to revoke".to_string(),
    };
    Ok(Json(MessageResponse { message }).into_response())
}
