//! Refresh-session lifecycle: creation, revocation, cap enforcement.
//!
//! The durable store is the source of truth; the cache denylist only makes
//! "is this jti revoked" cheap. Denylist writes are best effort and always
//! happen after the durable revoke, so a cache miss during the gap resolves
//! correctly against the durable row.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::cache::TtlCache;
use super::storage::{self, NewSessionRow, SessionRow, StorageError};

/// Everything needed to record a freshly issued refresh token.
pub struct NewSession {
    pub user_id: Uuid,
    pub jti: Uuid,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

pub struct SessionManager {
    pool: PgPool,
    cache: Arc<dyn TtlCache>,
    max_sessions: usize,
}

/// Hash a refresh token for storage. The raw token never touches the
/// database; the hash also defends against a signing-secret compromise,
/// since a minted token will not match any stored session.
#[must_use]
pub fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn denylist_key(jti: Uuid) -> String {
    format!("denylist:{jti}")
}

/// Remaining lifetime of a session, floored at one second so denylist
/// entries always outlive the last usable moment of the token.
fn remaining_ttl(expires_at: DateTime<Utc>) -> Duration {
    let seconds = (expires_at - Utc::now()).num_seconds().max(1);
    Duration::from_secs(seconds.unsigned_abs())
}

impl SessionManager {
    #[must_use]
    pub fn new(pool: PgPool, cache: Arc<dyn TtlCache>, max_sessions: usize) -> Self {
        Self {
            pool,
            cache,
            max_sessions,
        }
    }

    /// Insert a new session row. Does not enforce the session cap; callers
    /// run `enforce_session_limit` afterward.
    pub async fn create_session(&self, session: NewSession) -> Result<(), StorageError> {
        storage::insert_session(
            &self.pool,
            &NewSessionRow {
                user_id: session.user_id,
                jti: session.jti,
                token_hash: hash_refresh_token(&session.refresh_token),
                expires_at: session.expires_at,
                user_agent: session.user_agent,
                ip: session.ip,
            },
        )
        .await
    }

    pub async fn find_session(
        &self,
        jti: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SessionRow>, StorageError> {
        storage::find_session(&self.pool, jti, user_id).await
    }

    /// Revoke a session durably and denylist its `jti`. Returns whether this
    /// call performed the transition; `Ok(false)` means the row was already
    /// consumed, here or by a concurrent caller racing on the same session.
    pub async fn revoke_and_cache(&self, session: &SessionRow) -> Result<bool, StorageError> {
        if session.revoked_at.is_some() {
            return Ok(false);
        }
        let transitioned = storage::revoke_session(&self.pool, session.id).await?;
        if transitioned {
            self.mark_revoked_in_cache(session.jti, remaining_ttl(session.expires_at))
                .await;
        }
        Ok(transitioned)
    }

    /// Write a denylist entry without a durable row. Used when a presented
    /// token's `jti` has no session here at all, so a retry with the same
    /// token stays blocked for its remaining lifetime.
    pub async fn mark_revoked_in_cache(&self, jti: Uuid, ttl: Duration) {
        if let Err(err) = self.cache.set(&denylist_key(jti), "revoked", ttl).await {
            warn!("Failed to denylist jti {jti}: {err}");
        }
    }

    /// Fast denylist check. A miss only means "not known revoked"; the
    /// caller still has to consult the durable record.
    pub async fn is_revoked(&self, jti: Uuid) -> bool {
        match self.cache.get(&denylist_key(jti)).await {
            Ok(entry) => entry.is_some(),
            Err(err) => {
                warn!("Denylist lookup failed for jti {jti}: {err}");
                false
            }
        }
    }

    /// Revoke the oldest sessions beyond the per-user cap so at most
    /// `max_sessions` remain active.
    pub async fn enforce_session_limit(&self, user_id: Uuid) -> Result<(), StorageError> {
        let active = storage::active_sessions(&self.pool, user_id, true).await?;
        if active.len() <= self.max_sessions {
            return Ok(());
        }
        let excess = active.len() - self.max_sessions;
        for session in &active[..excess] {
            self.revoke_and_cache(session).await?;
        }
        Ok(())
    }

    /// Active sessions newest first. Hash fields stay inside this boundary;
    /// the handler projects rows to metadata before responding.
    pub async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<SessionRow>, StorageError> {
        storage::active_sessions(&self.pool, user_id, false).await
    }

    /// Revoke every active session of a user. The bulk durable update is
    /// authoritative; per-jti denylisting afterward is best effort.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<usize, StorageError> {
        let revoked = storage::revoke_all_sessions(&self.pool, user_id).await?;
        for (jti, expires_at) in &revoked {
            self.mark_revoked_in_cache(*jti, remaining_ttl(*expires_at))
                .await;
        }
        Ok(revoked.len())
    }
}
