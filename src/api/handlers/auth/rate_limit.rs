//! Fixed-window request limiter for the login path.
//!
//! Counters are keyed by method, path, and client identifier. Unlike the
//! brute-force guard this fails closed: the limiter exists to shed load
//! exactly when the backing store is struggling, so a counter outage
//! rejects instead of waving traffic through.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use super::audit::{self, AuditEvent};
use super::cache::TtlCache;
use super::error::AuthError;

pub struct RateLimitGuard {
    cache: Arc<dyn TtlCache>,
    max_requests: i64,
    window: Duration,
}

impl RateLimitGuard {
    #[must_use]
    pub fn new(cache: Arc<dyn TtlCache>, max_requests: i64, window: Duration) -> Self {
        Self {
            cache,
            max_requests,
            window,
        }
    }

    /// Count this request and decide. The window TTL is set only when the
    /// post-increment count is 1 (classic fixed window).
    pub async fn check(&self, method: &str, path: &str, client: &str) -> Result<(), AuthError> {
        let key = format!("rl:{method}:{path}:{client}");
        let count = self.cache.incr(&key).await.map_err(|err| {
            error!("Rate-limit counter unavailable for {key}: {err}");
            AuthError::ServiceUnavailable
        })?;
        if count == 1 {
            self.cache.expire(&key, self.window).await.map_err(|err| {
                error!("Failed to set rate-limit window on {key}: {err}");
                AuthError::ServiceUnavailable
            })?;
        }
        if count > self.max_requests {
            let retry_after = self
                .cache
                .ttl(&key)
                .await
                .unwrap_or(None)
                .unwrap_or(self.window);
            return Err(AuthError::RateLimited { retry_after });
        }
        Ok(())
    }
}

/// Client identifier for throttling: the first entry of `x-forwarded-for`
/// when a proxy set one, otherwise the socket address.
#[must_use]
pub fn client_identifier(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            addr.map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string())
        })
}

/// Axum layer applied to the throttled routes.
pub async fn rate_limit_middleware(
    State(guard): State<Arc<RateLimitGuard>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_identifier(request.headers(), Some(addr));
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    match guard.check(&method, &path, &client).await {
        Ok(()) => next.run(request).await,
        Err(err) => {
            if matches!(err, AuthError::RateLimited { .. }) {
                audit::emit(&AuditEvent::RateLimitExceeded {
                    method,
                    path,
                    client,
                });
            }
            err.into_response()
        }
    }
}
