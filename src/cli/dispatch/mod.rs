//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to the appropriate action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches("hash-password") {
        let password = sub
            .get_one::<String>("password")
            .cloned()
            .context("missing required argument: --password")?;
        let time_cost = sub.get_one::<u32>("time-cost").copied().unwrap_or(10);
        return Ok(Action::HashPassword {
            password: SecretString::from(password),
            time_cost,
        });
    }

    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        auth: auth_opts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_action_carries_the_auth_options() -> Result<()> {
        let matches = crate::cli::commands::new().try_get_matches_from(vec![
            "portero",
            "--dsn",
            "postgres://user@localhost:5432/portero",
            "--access-token-secret",
            "access-secret",
            "--refresh-token-secret",
            "refresh-secret",
            "--max-sessions-per-user",
            "3",
        ])?;
        let Action::Server(args) = handler(&matches)? else {
            anyhow::bail!("expected a server action");
        };
        assert_eq!(args.port, 8080);
        assert_eq!(args.dsn, "postgres://user@localhost:5432/portero");
        assert_eq!(args.auth.max_sessions_per_user, 3);
        assert_eq!(args.auth.rate_limit_max_requests, 10);
        Ok(())
    }

    #[test]
    fn hash_password_subcommand_skips_server_requirements() -> Result<()> {
        let matches = crate::cli::commands::new().try_get_matches_from(vec![
            "portero",
            "hash-password",
            "--password",
            "hunter2hunter2",
            "--time-cost",
            "2",
        ])?;
        let Action::HashPassword { time_cost, .. } = handler(&matches)? else {
            anyhow::bail!("expected a hash-password action");
        };
        assert_eq!(time_cost, 2);
        Ok(())
    }
}
