//! Failed-login counters per email and per source address.
//!
//! The two counters are independent: many wrong passwords for one account
//! trip the email counter, while one address spraying attempts across many
//! accounts trips the IP counter even though each email stays under its own
//! limit. A successful login resets only the email counter; the IP counter
//! keeps accumulating so credential stuffing from one source is still
//! blunted.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::cache::TtlCache;

pub struct BruteForceGuard {
    cache: Arc<dyn TtlCache>,
    email_limit: i64,
    ip_limit: i64,
    window: Duration,
}

/// Current attempt counts and window TTLs, for building "try again in N
/// minutes" messages.
#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub email_attempts: i64,
    pub ip_attempts: i64,
    pub email_ttl: Option<Duration>,
    pub ip_ttl: Option<Duration>,
}

fn email_key(email: &str) -> String {
    format!("bf:email:{email}")
}

fn ip_key(ip: &str) -> String {
    format!("bf:ip:{ip}")
}

impl BruteForceGuard {
    #[must_use]
    pub fn new(cache: Arc<dyn TtlCache>, email_limit: i64, ip_limit: i64, window: Duration) -> Self {
        Self {
            cache,
            email_limit,
            ip_limit,
            window,
        }
    }

    /// Record one failed attempt against both counters. The window TTL is
    /// set on a counter's first increment, so the window resets once no
    /// failures occur for its full duration.
    pub async fn record_failure(&self, email: &str, ip: Option<&str>) {
        self.bump(&email_key(email)).await;
        if let Some(ip) = ip {
            self.bump(&ip_key(ip)).await;
        }
    }

    async fn bump(&self, key: &str) {
        match self.cache.incr(key).await {
            Ok(1) => {
                if let Err(err) = self.cache.expire(key, self.window).await {
                    warn!("Failed to set brute-force window on {key}: {err}");
                }
            }
            Ok(_) => {}
            Err(err) => warn!("Failed to count login failure on {key}: {err}"),
        }
    }

    /// True once either counter has reached its limit inside the live
    /// window. Fails open: login availability beats brute-force protection
    /// during a cache outage.
    pub async fn is_blocked(&self, email: &str, ip: Option<&str>) -> bool {
        if self.count(&email_key(email)).await >= self.email_limit {
            return true;
        }
        match ip {
            Some(ip) => self.count(&ip_key(ip)).await >= self.ip_limit,
            None => false,
        }
    }

    async fn count(&self, key: &str) -> i64 {
        match self.cache.get(key).await {
            Ok(Some(value)) => value.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(err) => {
                warn!("Brute-force counter unavailable for {key}: {err}");
                0
            }
        }
    }

    /// Reset the email counter after a successful login. The IP counter is
    /// deliberately left untouched.
    pub async fn reset_email(&self, email: &str) {
        if let Err(err) = self.cache.delete(&email_key(email)).await {
            warn!("Failed to reset brute-force counter for {email}: {err}");
        }
    }

    pub async fn block_info(&self, email: &str, ip: Option<&str>) -> BlockInfo {
        let email_key = email_key(email);
        let ip_attempts = match ip {
            Some(ip) => self.count(&ip_key(ip)).await,
            None => 0,
        };
        let ip_ttl = match ip {
            Some(ip) => self.cache.ttl(&ip_key(ip)).await.unwrap_or(None),
            None => None,
        };
        BlockInfo {
            email_attempts: self.count(&email_key).await,
            ip_attempts,
            email_ttl: self.cache.ttl(&email_key).await.unwrap_or(None),
            ip_ttl,
        }
    }

    /// Attempts left before the email counter blocks, for the hint shown
    /// while still under the threshold.
    #[must_use]
    pub fn remaining_email_attempts(&self, info: &BlockInfo) -> i64 {
        (self.email_limit - info.email_attempts).max(0)
    }

    /// How long until the blocking window expires: the longest live TTL, or
    /// the full window if the counters carry none.
    #[must_use]
    pub fn retry_after(&self, info: &BlockInfo) -> Duration {
        info.email_ttl
            .into_iter()
            .chain(info.ip_ttl)
            .max()
            .unwrap_or(self.window)
    }
}
