use crate::{api, cli::commands::auth};
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub auth: auth::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = api::handlers::auth::AuthConfig::new(
        args.auth.access_token_secret,
        args.auth.refresh_token_secret,
    )
    .with_access_ttl_seconds(args.auth.access_token_ttl_seconds)
    .with_refresh_ttl_seconds(args.auth.refresh_token_ttl_seconds)
    .with_access_cookie_max_age_seconds(args.auth.access_cookie_max_age_seconds)
    .with_refresh_cookie_max_age_seconds(args.auth.refresh_cookie_max_age_seconds)
    .with_max_sessions_per_user(args.auth.max_sessions_per_user)
    .with_hash_time_cost(args.auth.hash_time_cost)
    .with_max_attempts_per_email(args.auth.max_login_attempts_per_email)
    .with_max_attempts_per_ip(args.auth.max_login_attempts_per_ip)
    .with_attempt_window_seconds(args.auth.attempt_window_seconds)
    .with_rate_limit_max_requests(args.auth.rate_limit_max_requests)
    .with_rate_limit_window_seconds(args.auth.rate_limit_window_seconds)
    .with_production(args.auth.production);

    api::new(args.port, args.dsn, auth_config).await
}
