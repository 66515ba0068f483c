//! Session and credential management.
//!
//! This module carries the whole authentication core: password login,
//! short-lived access tokens, rotating refresh sessions, revocation, and the
//! abuse guards in front of the login path.
//!
//! ## Refresh sessions
//!
//! Every refresh token is single-use. Presenting one consumes its session
//! row and issues a replacement with a fresh `jti`; the consumed `jti` lands
//! on a TTL denylist so replays are rejected without a database read. Each
//! user holds at most a configured number of active sessions, oldest evicted
//! first.
//!
//! ## Abuse guards
//!
//! - **Brute force:** per-email and per-IP failure counters over a fixed
//!   window. The email counter resets on successful login; the IP counter
//!   only ever expires. Counter outages fail open.
//! - **Rate limit:** fixed-window request ceiling per method, path, and
//!   client. Counter outages fail closed.

pub(crate) mod audit;
mod brute_force;
pub(crate) mod cache;
pub(crate) mod cookies;
mod error;
mod login;
pub(crate) mod password;
pub(crate) mod principal;
pub(crate) mod rate_limit;
pub(crate) mod session;
mod sessions;
mod state;
mod storage;
mod tokens;
pub(crate) mod types;
mod utils;

pub use error::AuthError;
pub use login::login;
pub use rate_limit::{rate_limit_middleware, RateLimitGuard};
pub use session::{list_sessions, logout, logout_all, refresh, revoke_session};
pub use state::{AuthConfig, AuthState};
