//! Database access for users and refresh sessions.
//!
//! All queries run inside `db.query` tracing spans. Driver-specific error
//! shapes stop here: unique-key conflicts surface as
//! `StorageError::UniqueViolation` so business logic stays store-agnostic.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unique constraint violation")]
    UniqueViolation,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            Self::UniqueViolation
        } else {
            Self::Database(err)
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// User record as the login path needs it. Consumed read-only here; user
/// administration belongs to a different service.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_blocked: bool,
}

/// One issued refresh session. Rows are immutable after insert except for
/// the single unrevoked → revoked transition.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub jti: Uuid,
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionRow {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

pub struct NewSessionRow {
    pub user_id: Uuid,
    pub jti: Uuid,
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

const SESSION_COLUMNS: &str =
    "id, user_id, jti, token_hash, expires_at, revoked_at, user_agent, ip, created_at";

fn session_from_row(row: &sqlx::postgres::PgRow) -> SessionRow {
    SessionRow {
        id: row.get("id"),
        user_id: row.get("user_id"),
        jti: row.get("jti"),
        token_hash: row.get("token_hash"),
        expires_at: row.get("expires_at"),
        revoked_at: row.get("revoked_at"),
        user_agent: row.get("user_agent"),
        ip: row.get("ip"),
        created_at: row.get("created_at"),
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        is_blocked: row.get("is_blocked"),
    }
}

pub async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>, StorageError> {
    let query =
        "SELECT id, email, password_hash, role, is_blocked FROM users WHERE email = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

pub async fn lookup_user_by_id(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserRecord>, StorageError> {
    let query =
        "SELECT id, email, password_hash, role, is_blocked FROM users WHERE id = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

pub async fn insert_session(pool: &PgPool, session: &NewSessionRow) -> Result<(), StorageError> {
    let query = r"
        INSERT INTO refresh_sessions (user_id, jti, token_hash, expires_at, user_agent, ip)
        VALUES ($1, $2, $3, $4, $5, $6)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session.user_id)
        .bind(session.jti)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(&session.user_agent)
        .bind(&session.ip)
        .execute(pool)
        .instrument(span)
        .await?;
    Ok(())
}

/// Point lookup by `(jti, user)`. Absence is a legitimate outcome, not an
/// error; the caller decides what a missing session means.
pub async fn find_session(
    pool: &PgPool,
    jti: Uuid,
    user_id: Uuid,
) -> Result<Option<SessionRow>, StorageError> {
    let query = format!(
        "SELECT {SESSION_COLUMNS} FROM refresh_sessions WHERE jti = $1 AND user_id = $2 LIMIT 1"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(jti)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.as_ref().map(session_from_row))
}

/// Stamp `revoked_at` on a single session.
///
/// The `revoked_at IS NULL` guard makes the transition atomic: of two
/// concurrent revokes only one observes `true`, and a revoked row can never
/// be un-revoked.
pub async fn revoke_session(pool: &PgPool, session_id: Uuid) -> Result<bool, StorageError> {
    let query = r"
        UPDATE refresh_sessions
        SET revoked_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND revoked_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(session_id)
        .execute(pool)
        .instrument(span)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Active sessions for a user, oldest first (for cap eviction) or newest
/// first (for listing).
pub async fn active_sessions(
    pool: &PgPool,
    user_id: Uuid,
    oldest_first: bool,
) -> Result<Vec<SessionRow>, StorageError> {
    let order = if oldest_first { "ASC" } else { "DESC" };
    let query = format!(
        "SELECT {SESSION_COLUMNS} FROM refresh_sessions \
         WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW() \
         ORDER BY created_at {order}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;
    Ok(rows.iter().map(session_from_row).collect())
}

/// Revoke every active session of a user in one statement, returning the
/// `(jti, expires_at)` pairs for follow-up denylisting.
pub async fn revoke_all_sessions(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<(Uuid, DateTime<Utc>)>, StorageError> {
    let query = r"
        UPDATE refresh_sessions
        SET revoked_at = NOW(), updated_at = NOW()
        WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
        RETURNING jti, expires_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;
    Ok(rows
        .iter()
        .map(|row| (row.get("jti"), row.get("expires_at")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration, revoked: bool) -> SessionRow {
        SessionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            token_hash: vec![1, 2, 3],
            expires_at: Utc::now() + expires_in,
            revoked_at: revoked.then(Utc::now),
            user_agent: None,
            ip: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn session_is_active_until_revoked_or_expired() {
        assert!(session(Duration::hours(1), false).is_active());
        assert!(!session(Duration::hours(1), true).is_active());
        assert!(!session(Duration::hours(-1), false).is_active());
    }

    #[test]
    fn storage_error_keeps_unique_violations_distinct() {
        let err = StorageError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StorageError::Database(_)));
    }
}
