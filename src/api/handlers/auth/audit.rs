//! Structured audit events for security-relevant decisions.
//!
//! Every login outcome, block, rotation, and revocation is emitted on the
//! dedicated `audit` tracing target as a serialized, tagged event. This
//! channel is part of the contract; other log lines are incidental.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum AuditEvent {
    LoginSucceeded {
        user_id: Uuid,
        email: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
    },
    LoginFailed {
        email: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
        reason: String,
    },
    BruteForceBlocked {
        email: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
        retry_after_seconds: u64,
    },
    RateLimitExceeded {
        method: String,
        path: String,
        client: String,
    },
    RefreshRejected {
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        jti: Option<Uuid>,
        reason: String,
    },
    SessionRotated {
        user_id: Uuid,
        old_jti: Uuid,
        new_jti: Uuid,
    },
    SessionRevoked {
        user_id: Uuid,
        jti: Uuid,
    },
    SessionsRevokedAll {
        user_id: Uuid,
        count: usize,
    },
}

pub fn emit(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => info!(target: "audit", event = %payload, "security event"),
        Err(err) => warn!("Failed to serialize audit event: {err}"),
    }
}
