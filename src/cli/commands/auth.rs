use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use secrecy::SecretString;

pub const ARG_ACCESS_TOKEN_SECRET: &str = "access-token-secret";
pub const ARG_REFRESH_TOKEN_SECRET: &str = "refresh-token-secret";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    let command = with_session_args(command);
    with_guard_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_SECRET)
                .long(ARG_ACCESS_TOKEN_SECRET)
                .help("HMAC secret for signing access tokens")
                .env("PORTERO_ACCESS_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_SECRET)
                .long(ARG_REFRESH_TOKEN_SECRET)
                .help("HMAC secret for signing refresh tokens")
                .env("PORTERO_REFRESH_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("access-token-ttl-seconds")
                .long("access-token-ttl-seconds")
                .help("Access token lifetime in seconds")
                .env("PORTERO_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-token-ttl-seconds")
                .long("refresh-token-ttl-seconds")
                .help("Refresh token lifetime in seconds")
                .env("PORTERO_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("access-cookie-max-age-seconds")
                .long("access-cookie-max-age-seconds")
                .help("Max-Age of the access token cookie in seconds")
                .env("PORTERO_ACCESS_COOKIE_MAX_AGE_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-cookie-max-age-seconds")
                .long("refresh-cookie-max-age-seconds")
                .help("Max-Age of the refresh token cookie in seconds")
                .env("PORTERO_REFRESH_COOKIE_MAX_AGE_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("max-sessions-per-user")
                .long("max-sessions-per-user")
                .help("Active refresh sessions allowed per user, oldest evicted first")
                .env("PORTERO_MAX_SESSIONS_PER_USER")
                .default_value("5")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("hash-time-cost")
                .long("hash-time-cost")
                .help("Argon2 iteration count (t_cost) for password hashing")
                .env("PORTERO_HASH_TIME_COST")
                .default_value("10")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("production")
                .long("production")
                .help("Issue cookies with Secure and SameSite=None for cross-site frontends")
                .env("PORTERO_PRODUCTION")
                .action(ArgAction::SetTrue),
        )
}

fn with_guard_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("max-login-attempts-per-email")
                .long("max-login-attempts-per-email")
                .help("Failed logins per email before the account is temporarily blocked")
                .env("PORTERO_MAX_LOGIN_ATTEMPTS_PER_EMAIL")
                .default_value("5")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("max-login-attempts-per-ip")
                .long("max-login-attempts-per-ip")
                .help("Failed logins per IP before the address is temporarily blocked")
                .env("PORTERO_MAX_LOGIN_ATTEMPTS_PER_IP")
                .default_value("20")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("attempt-window-seconds")
                .long("attempt-window-seconds")
                .help("Sliding lifetime of the failed-login counters in seconds")
                .env("PORTERO_ATTEMPT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("rate-limit-max-requests")
                .long("rate-limit-max-requests")
                .help("Requests allowed per client on the login route per window")
                .env("PORTERO_RATE_LIMIT_MAX_REQUESTS")
                .default_value("10")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("rate-limit-window-seconds")
                .long("rate-limit-window-seconds")
                .help("Fixed rate-limit window in seconds")
                .env("PORTERO_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub access_token_secret: SecretString,
    pub refresh_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub access_cookie_max_age_seconds: i64,
    pub refresh_cookie_max_age_seconds: i64,
    pub max_sessions_per_user: usize,
    pub hash_time_cost: u32,
    pub max_login_attempts_per_email: i64,
    pub max_login_attempts_per_ip: i64,
    pub attempt_window_seconds: u64,
    pub rate_limit_max_requests: i64,
    pub rate_limit_window_seconds: u64,
    pub production: bool,
}

impl Options {
    /// Collect the auth options from validated matches.
    ///
    /// # Errors
    /// Returns an error if a required secret is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let access_token_secret = matches
            .get_one::<String>(ARG_ACCESS_TOKEN_SECRET)
            .cloned()
            .with_context(|| format!("missing required argument: --{ARG_ACCESS_TOKEN_SECRET}"))?;
        let refresh_token_secret = matches
            .get_one::<String>(ARG_REFRESH_TOKEN_SECRET)
            .cloned()
            .with_context(|| format!("missing required argument: --{ARG_REFRESH_TOKEN_SECRET}"))?;

        Ok(Self {
            access_token_secret: SecretString::from(access_token_secret),
            refresh_token_secret: SecretString::from(refresh_token_secret),
            access_token_ttl_seconds: matches
                .get_one::<i64>("access-token-ttl-seconds")
                .copied()
                .unwrap_or(3600),
            refresh_token_ttl_seconds: matches
                .get_one::<i64>("refresh-token-ttl-seconds")
                .copied()
                .unwrap_or(2_592_000),
            access_cookie_max_age_seconds: matches
                .get_one::<i64>("access-cookie-max-age-seconds")
                .copied()
                .unwrap_or(900),
            refresh_cookie_max_age_seconds: matches
                .get_one::<i64>("refresh-cookie-max-age-seconds")
                .copied()
                .unwrap_or(2_592_000),
            max_sessions_per_user: matches
                .get_one::<usize>("max-sessions-per-user")
                .copied()
                .unwrap_or(5),
            hash_time_cost: matches.get_one::<u32>("hash-time-cost").copied().unwrap_or(10),
            max_login_attempts_per_email: matches
                .get_one::<i64>("max-login-attempts-per-email")
                .copied()
                .unwrap_or(5),
            max_login_attempts_per_ip: matches
                .get_one::<i64>("max-login-attempts-per-ip")
                .copied()
                .unwrap_or(20),
            attempt_window_seconds: matches
                .get_one::<u64>("attempt-window-seconds")
                .copied()
                .unwrap_or(900),
            rate_limit_max_requests: matches
                .get_one::<i64>("rate-limit-max-requests")
                .copied()
                .unwrap_or(10),
            rate_limit_window_seconds: matches
                .get_one::<u64>("rate-limit-window-seconds")
                .copied()
                .unwrap_or(60),
            production: matches.get_flag("production"),
        })
    }
}
