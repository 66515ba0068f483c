//! Signing and verification for access and refresh tokens.
//!
//! Both token classes are HS256 JWTs but are signed with independent
//! secrets, so a leaked access-signing key cannot mint refresh tokens.
//! Refresh tokens additionally carry a unique `jti`: once signed, a token is
//! stateless, and the `jti` is the only usable revocation handle.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::error::AuthError;

/// Claims carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by every refresh token. The `jti` is unique per issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenCodec {
    #[must_use]
    pub fn new(
        access_secret: &SecretString,
        refresh_secret: &SecretString,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        let access = access_secret.expose_secret().as_bytes();
        let refresh = refresh_secret.expose_secret().as_bytes();
        Self {
            access_encoding: EncodingKey::from_secret(access),
            access_decoding: DecodingKey::from_secret(access),
            refresh_encoding: EncodingKey::from_secret(refresh),
            refresh_decoding: DecodingKey::from_secret(refresh),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    pub fn sign_access(
        &self,
        user_id: Uuid,
        email: &str,
        role: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id,
            email: email.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now + self.access_ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.access_encoding)
    }

    pub fn sign_refresh(
        &self,
        user_id: Uuid,
        email: &str,
        role: &str,
        jti: Uuid,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user_id,
            email: email.to_string(),
            role: role.to_string(),
            jti,
            iat: now,
            exp: now + self.refresh_ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.refresh_encoding)
    }

    /// Verify signature and expiry against the access secret.
    ///
    /// Every failure mode collapses to `Unauthorized`; callers must not be
    /// able to distinguish "expired" from "forged".
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        decode::<AccessClaims>(
            token,
            &self.access_decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::Unauthorized)
    }

    /// Verify signature and expiry against the refresh secret.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        decode::<RefreshClaims>(
            token,
            &self.refresh_decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::Unauthorized)
    }

    /// Best-effort decode for logout bookkeeping: the signature must still
    /// match, but an expired token is fine; its session may outlive it in
    /// the store and deserves revocation anyway.
    #[must_use]
    pub fn decode_refresh_lenient(&self, token: &str) -> Option<RefreshClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<RefreshClaims>(token, &self.refresh_decoding, &validation)
            .ok()
            .map(|data| data.claims)
    }

    /// Decode the expiry claim without verifying the signature.
    ///
    /// Used for bookkeeping such as computing a denylist TTL. When the claim
    /// is absent or unreadable the full refresh lifetime is assumed, so a
    /// cache entry is never written with a zero or negative TTL.
    #[must_use]
    pub fn decode_expiry(&self, token: &str) -> DateTime<Utc> {
        self.unverified_exp(token)
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
            .unwrap_or_else(|| {
                Utc::now() + chrono::Duration::seconds(self.refresh_ttl_seconds)
            })
    }

    /// Whole seconds until the token's expiry claim, or `None` if the token
    /// is already expired or unparseable.
    #[must_use]
    pub fn ttl_remaining(&self, token: &str) -> Option<Duration> {
        let exp = self.unverified_exp(token)?;
        let remaining = exp - Utc::now().timestamp();
        if remaining > 0 {
            Some(Duration::from_secs(remaining.unsigned_abs()))
        } else {
            None
        }
    }

    fn unverified_exp(&self, token: &str) -> Option<i64> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<serde_json::Value>(token, &self.refresh_decoding, &validation)
            .ok()
            .and_then(|data| data.claims.get("exp").and_then(serde_json::Value::as_i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            &SecretString::from("access-secret-long-enough-for-hmac"),
            &SecretString::from("refresh-secret-long-enough-for-hmac"),
            3600,
            2_592_000,
        )
    }

    #[test]
    fn access_token_roundtrip() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let token = codec
            .sign_access(user_id, "alice@example.com", "user")
            .expect("signing succeeds");
        let claims = codec.verify_access(&token).expect("verification succeeds");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, "user");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_carries_jti() {
        let codec = codec();
        let jti = Uuid::new_v4();
        let token = codec
            .sign_refresh(Uuid::new_v4(), "alice@example.com", "user", jti)
            .expect("signing succeeds");
        let claims = codec.verify_refresh(&token).expect("verification succeeds");
        assert_eq!(claims.jti, jti);
    }

    #[test]
    fn access_secret_cannot_verify_refresh_tokens() {
        let codec = codec();
        let token = codec
            .sign_refresh(Uuid::new_v4(), "a@b.co", "user", Uuid::new_v4())
            .expect("signing succeeds");
        assert!(codec.verify_access(&token).is_err());
    }

    #[test]
    fn expired_refresh_token_is_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: Uuid::new_v4(),
            email: "a@b.co".to_string(),
            role: "user".to_string(),
            jti: Uuid::new_v4(),
            iat: now - 600,
            // Past the default 60s validation leeway.
            exp: now - 300,
        };
        let token = encode(&Header::default(), &claims, &codec.refresh_encoding)
            .expect("encoding succeeds");
        assert!(codec.verify_refresh(&token).is_err());
        assert_eq!(codec.ttl_remaining(&token), None);
    }

    #[test]
    fn ttl_remaining_tracks_expiry_claim() {
        let codec = codec();
        let token = codec
            .sign_refresh(Uuid::new_v4(), "a@b.co", "user", Uuid::new_v4())
            .expect("signing succeeds");
        let remaining = codec.ttl_remaining(&token).expect("token not yet expired");
        assert!(remaining <= Duration::from_secs(2_592_000));
        assert!(remaining > Duration::from_secs(2_592_000 - 60));
    }

    #[test]
    fn decode_expiry_falls_back_to_full_refresh_lifetime() {
        let codec = codec();
        let fallback = codec.decode_expiry("not-a-token");
        let expected = Utc::now() + chrono::Duration::seconds(2_592_000);
        assert!((fallback - expected).num_seconds().abs() < 5);
    }

    #[test]
    fn decode_expiry_reads_claim_without_verification() {
        let codec = codec();
        let other = TokenCodec::new(
            &SecretString::from("unrelated-access-secret-material"),
            &SecretString::from("unrelated-refresh-secret-material"),
            3600,
            2_592_000,
        );
        let token = other
            .sign_refresh(Uuid::new_v4(), "a@b.co", "user", Uuid::new_v4())
            .expect("signing succeeds");
        // Signed with a foreign secret, so verification fails but the expiry
        // claim is still readable for bookkeeping.
        assert!(codec.verify_refresh(&token).is_err());
        let expiry = codec.decode_expiry(&token);
        assert!(expiry > Utc::now() + chrono::Duration::seconds(2_592_000 - 60));
    }
}
