//! Password login and token issuance.

use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::audit::{self, AuditEvent};
use super::cookies::set_token_cookies;
use super::error::AuthError;
use super::password::verify_password;
use super::sessions::NewSession;
use super::state::AuthState;
use super::storage::{self, UserRecord};
use super::types::{LoginRequest, LoginResponse, UserResponse};
use super::utils::{extract_client_ip, extract_user_agent, normalize_email, valid_email};

/// Tokens minted for one successful login or rotation.
pub(super) struct IssuedTokens {
    pub(super) access_token: String,
    pub(super) refresh_token: String,
    pub(super) jti: Uuid,
    pub(super) expires_at: DateTime<Utc>,
}

/// Sign a fresh access/refresh pair, record the session, and enforce the
/// per-user cap. Shared by login and refresh; rotation only differs in
/// having revoked the presented session first.
pub(super) async fn issue_session(
    state: &AuthState,
    user: &UserRecord,
    user_agent: Option<String>,
    ip: Option<String>,
) -> Result<IssuedTokens, AuthError> {
    let jti = Uuid::new_v4();
    let access_token = state
        .codec()
        .sign_access(user.id, &user.email, &user.role)
        .map_err(|err| AuthError::Internal(err.into()))?;
    let refresh_token = state
        .codec()
        .sign_refresh(user.id, &user.email, &user.role, jti)
        .map_err(|err| AuthError::Internal(err.into()))?;
    let expires_at = state.codec().decode_expiry(&refresh_token);

    state
        .sessions()
        .create_session(NewSession {
            user_id: user.id,
            jti,
            refresh_token: refresh_token.clone(),
            expires_at,
            user_agent,
            ip,
        })
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;
    state
        .sessions()
        .enforce_session_limit(user.id)
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;

    Ok(IssuedTokens {
        access_token,
        refresh_token,
        jti,
        expires_at,
    })
}

pub async fn login(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Ok((StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response());
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Ok((StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response());
    }

    let ip = extract_client_ip(&headers);
    let user_agent = extract_user_agent(&headers);

    if state.brute_force().is_blocked(&email, ip.as_deref()).await {
        let info = state.brute_force().block_info(&email, ip.as_deref()).await;
        let retry_after = state.brute_force().retry_after(&info);
        audit::emit(&AuditEvent::BruteForceBlocked {
            email,
            ip,
            retry_after_seconds: retry_after.as_secs(),
        });
        return Err(AuthError::BruteForceBlocked { retry_after });
    }

    let user = storage::lookup_user_by_email(&pool, &email)
        .await
        .map_err(|err| AuthError::Internal(err.into()))?;
    let Some(user) = user else {
        // Unknown email still counts as a failed attempt; the response never
        // says which field was wrong.
        state.brute_force().record_failure(&email, ip.as_deref()).await;
        audit::emit(&AuditEvent::LoginFailed {
            email,
            ip,
            reason: "unknown email".to_string(),
        });
        return Err(AuthError::InvalidCredentials { remaining: None });
    };

    if user.is_blocked {
        // The account is the problem, not the credential; nothing to count.
        audit::emit(&AuditEvent::LoginFailed {
            email,
            ip,
            reason: "account blocked".to_string(),
        });
        return Err(AuthError::AccountBlocked);
    }

    let password_ok = verify_password(&request.password, &user.password_hash)
        .map_err(|err| AuthError::Internal(anyhow::anyhow!("password verification: {err}")))?;
    if !password_ok {
        state.brute_force().record_failure(&email, ip.as_deref()).await;
        audit::emit(&AuditEvent::LoginFailed {
            email: email.clone(),
            ip: ip.clone(),
            reason: "wrong password".to_string(),
        });
        let info = state.brute_force().block_info(&email, ip.as_deref()).await;
        let remaining = state.brute_force().remaining_email_attempts(&info);
        if remaining == 0 {
            return Err(AuthError::BruteForceBlocked {
                retry_after: state.brute_force().retry_after(&info),
            });
        }
        return Err(AuthError::InvalidCredentials {
            remaining: Some(remaining),
        });
    }

    state.brute_force().reset_email(&email).await;

    let issued = issue_session(&state, &user, user_agent, ip.clone()).await?;

    audit::emit(&AuditEvent::LoginSucceeded {
        user_id: user.id,
        email: user.email.clone(),
        ip,
    });

    let mut response_headers = HeaderMap::new();
    set_token_cookies(
        &mut response_headers,
        state.config().cookie_options(),
        &issued.access_token,
        &issued.refresh_token,
    )
    .map_err(|err| AuthError::Internal(anyhow::anyhow!("token cookie: {err}")))?;

    let body = LoginResponse {
        user: UserResponse {
            id: user.id,
            email: user.email,
            role: user.role,
        },
    };
    Ok((StatusCode::OK, response_headers, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::test_support::auth_state;
    use anyhow::Result;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    #[tokio::test]
    async fn login_missing_payload_is_bad_request() -> Result<()> {
        let response = login(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()?),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_rejects_malformed_email_before_any_lookup() -> Result<()> {
        let response = login(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()?),
            Some(Json(LoginRequest {
                email: "not-an-email".to_string(),
                password: "irrelevant".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn brute_forced_email_is_blocked_before_credential_checks() -> Result<()> {
        let state = auth_state()?;
        // Five failures trips the default email threshold; the block must
        // fire before any user lookup, so the lazy pool is never touched.
        for _ in 0..5 {
            state
                .brute_force()
                .record_failure("alice@example.com", None)
                .await;
        }
        let response = login(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(state),
            Some(Json(LoginRequest {
                email: "Alice@Example.com".to_string(),
                password: "whatever-correct-or-not".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().contains_key("retry-after"));
        Ok(())
    }
}
