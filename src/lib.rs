//! # Portero (Session & Credential Management)
//!
//! `portero` is a session and credential-management service for web
//! backends: password login, short-lived access tokens, long-lived rotating
//! refresh tokens, per-device refresh sessions, and brute-force / request
//! flood protection on the login path.
//!
//! ## Tokens & sessions
//!
//! Access and refresh tokens are HS256 JWTs signed with independent
//! secrets. Each refresh token corresponds to one `refresh_sessions` row
//! keyed by `jti`; presenting it consumes the row and issues a replacement
//! (rotation), and the consumed `jti` goes on a TTL denylist. Users hold at
//! most a configured number of active sessions; the oldest is evicted when
//! the cap is exceeded.
//!
//! ## Abuse protection
//!
//! - Failed logins are counted per email and per IP over a fixed window.
//!   The email counter resets on a successful login; the IP counter only
//!   ever expires, so distributed credential stuffing keeps paying its toll.
//! - The login route sits behind a fixed-window rate limiter keyed by
//!   method, path, and client. The limiter fails closed; the brute-force
//!   counters fail open.
//!
//! Every 401 on the token paths carries one generic body. The reason a
//! token was rejected is visible only in the `audit` log target.

pub mod api;
pub mod cli;
