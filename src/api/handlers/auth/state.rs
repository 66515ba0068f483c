//! Auth configuration and shared state.
//!
//! All knobs live in one immutable `AuthConfig` resolved at startup and
//! injected into each component's constructor; nothing resolves defaults at
//! call sites. Signing secrets are required to construct the config at all,
//! which is what makes a missing secret a fatal startup error rather than a
//! runtime one.

use secrecy::SecretString;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use super::brute_force::BruteForceGuard;
use super::cache::TtlCache;
use super::cookies::CookieOptions;
use super::sessions::SessionManager;
use super::tokens::TokenCodec;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_ACCESS_COOKIE_MAX_AGE_SECONDS: i64 = 15 * 60;
const DEFAULT_MAX_SESSIONS_PER_USER: usize = 5;
const DEFAULT_HASH_TIME_COST: u32 = 10;
const DEFAULT_MAX_ATTEMPTS_PER_EMAIL: i64 = 5;
const DEFAULT_MAX_ATTEMPTS_PER_IP: i64 = 20;
const DEFAULT_ATTEMPT_WINDOW_SECONDS: u64 = 15 * 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: i64 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    access_cookie_max_age_seconds: i64,
    refresh_cookie_max_age_seconds: i64,
    max_sessions_per_user: usize,
    hash_time_cost: u32,
    max_attempts_per_email: i64,
    max_attempts_per_ip: i64,
    attempt_window: Duration,
    rate_limit_max_requests: i64,
    rate_limit_window: Duration,
    production: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            access_cookie_max_age_seconds: DEFAULT_ACCESS_COOKIE_MAX_AGE_SECONDS,
            refresh_cookie_max_age_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            max_sessions_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
            hash_time_cost: DEFAULT_HASH_TIME_COST,
            max_attempts_per_email: DEFAULT_MAX_ATTEMPTS_PER_EMAIL,
            max_attempts_per_ip: DEFAULT_MAX_ATTEMPTS_PER_IP,
            attempt_window: Duration::from_secs(DEFAULT_ATTEMPT_WINDOW_SECONDS),
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
            production: false,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_access_cookie_max_age_seconds(mut self, seconds: i64) -> Self {
        self.access_cookie_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_cookie_max_age_seconds(mut self, seconds: i64) -> Self {
        self.refresh_cookie_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_sessions_per_user(mut self, max: usize) -> Self {
        self.max_sessions_per_user = max;
        self
    }

    #[must_use]
    pub fn with_hash_time_cost(mut self, cost: u32) -> Self {
        self.hash_time_cost = cost;
        self
    }

    #[must_use]
    pub fn with_max_attempts_per_email(mut self, max: i64) -> Self {
        self.max_attempts_per_email = max;
        self
    }

    #[must_use]
    pub fn with_max_attempts_per_ip(mut self, max: i64) -> Self {
        self.max_attempts_per_ip = max;
        self
    }

    #[must_use]
    pub fn with_attempt_window_seconds(mut self, seconds: u64) -> Self {
        self.attempt_window = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_rate_limit_max_requests(mut self, max: i64) -> Self {
        self.rate_limit_max_requests = max;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window_seconds(mut self, seconds: u64) -> Self {
        self.rate_limit_window = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    #[must_use]
    pub fn hash_time_cost(&self) -> u32 {
        self.hash_time_cost
    }

    #[must_use]
    pub fn rate_limit_max_requests(&self) -> i64 {
        self.rate_limit_max_requests
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }

    #[must_use]
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            production: self.production,
            access_max_age_seconds: self.access_cookie_max_age_seconds,
            refresh_max_age_seconds: self.refresh_cookie_max_age_seconds,
        }
    }
}

/// Shared state injected into the auth handlers.
pub struct AuthState {
    config: AuthConfig,
    codec: TokenCodec,
    sessions: SessionManager,
    brute_force: BruteForceGuard,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, pool: PgPool, cache: Arc<dyn TtlCache>) -> Self {
        let codec = TokenCodec::new(
            &config.access_secret,
            &config.refresh_secret,
            config.access_ttl_seconds,
            config.refresh_ttl_seconds,
        );
        let sessions = SessionManager::new(pool, cache.clone(), config.max_sessions_per_user);
        let brute_force = BruteForceGuard::new(
            cache,
            config.max_attempts_per_email,
            config.max_attempts_per_ip,
            config.attempt_window,
        );
        Self {
            config,
            codec,
            sessions,
            brute_force,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn brute_force(&self) -> &BruteForceGuard {
        &self.brute_force
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{AuthConfig, AuthState};
    use crate::api::handlers::auth::cache::MemoryCache;
    use anyhow::Result;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    pub(crate) fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("test-access-secret-material"),
            SecretString::from("test-refresh-secret-material"),
        )
    }

    /// State over a lazy pool: usable for every path that terminates before
    /// the first database round-trip.
    pub(crate) fn auth_state() -> Result<Arc<AuthState>> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        Ok(Arc::new(state_over(pool)))
    }

    /// State over a live pool, each call with its own cache. Two states over
    /// one pool model two service instances sharing a database.
    pub(crate) fn state_over(pool: sqlx::PgPool) -> AuthState {
        AuthState::new(config(), pool, Arc::new(MemoryCache::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_overrides() {
        let config = test_support::config();
        assert_eq!(config.access_ttl_seconds, DEFAULT_ACCESS_TTL_SECONDS);
        assert_eq!(config.refresh_ttl_seconds, DEFAULT_REFRESH_TTL_SECONDS);
        assert_eq!(config.max_sessions_per_user, 5);
        assert_eq!(config.hash_time_cost(), 10);
        assert_eq!(config.max_attempts_per_email, 5);
        assert_eq!(config.max_attempts_per_ip, 20);
        assert_eq!(config.attempt_window, Duration::from_secs(900));
        assert_eq!(config.rate_limit_max_requests(), 10);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
        assert!(!config.production);

        let config = config
            .with_access_ttl_seconds(120)
            .with_refresh_ttl_seconds(3600)
            .with_max_sessions_per_user(2)
            .with_hash_time_cost(3)
            .with_max_attempts_per_email(7)
            .with_max_attempts_per_ip(40)
            .with_attempt_window_seconds(60)
            .with_rate_limit_max_requests(99)
            .with_rate_limit_window_seconds(30)
            .with_production(true);

        assert_eq!(config.access_ttl_seconds, 120);
        assert_eq!(config.refresh_ttl_seconds, 3600);
        assert_eq!(config.max_sessions_per_user, 2);
        assert_eq!(config.hash_time_cost(), 3);
        assert_eq!(config.max_attempts_per_email, 7);
        assert_eq!(config.max_attempts_per_ip, 40);
        assert_eq!(config.attempt_window, Duration::from_secs(60));
        assert_eq!(config.rate_limit_max_requests(), 99);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(30));
        assert!(config.production);
    }

    #[test]
    fn cookie_options_follow_environment() {
        let options = test_support::config().with_production(true).cookie_options();
        assert!(options.production);
        assert_eq!(options.access_max_age_seconds, 900);
        assert_eq!(options.refresh_max_age_seconds, DEFAULT_REFRESH_TTL_SECONDS);
    }

    #[tokio::test]
    async fn auth_state_constructs_over_a_lazy_pool() -> anyhow::Result<()> {
        let state = test_support::auth_state()?;
        assert_eq!(state.config().hash_time_cost(), 10);
        Ok(())
    }
}
