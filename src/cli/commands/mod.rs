pub mod auth;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("portero")
        .about("Session and credential management")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_negates_reqs(true)
        .subcommand(
            Command::new("hash-password")
                .about("Hash a password for seeding user rows")
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help("Plaintext password to hash")
                        .env("PORTERO_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(
                    Arg::new("time-cost")
                        .long("time-cost")
                        .help("Argon2 iteration count (t_cost)")
                        .env("PORTERO_HASH_TIME_COST")
                        .default_value("10")
                        .value_parser(clap::value_parser!(u32)),
                ),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PORTERO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("PORTERO_DSN")
                .required(true),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_ENV: [(&str, &str); 3] = [
        ("PORTERO_DSN", "postgres://user@localhost:5432/portero"),
        ("PORTERO_ACCESS_TOKEN_SECRET", "access-secret"),
        ("PORTERO_REFRESH_TOKEN_SECRET", "refresh-secret"),
    ];

    fn matches_with_base_env(argv: Vec<&str>) -> clap::ArgMatches {
        for (key, value) in BASE_ENV {
            std::env::set_var(key, value);
        }
        new().get_matches_from(argv)
    }

    #[test]
    fn defaults_resolve_without_flags() {
        let matches = matches_with_base_env(vec!["portero"]);
        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
        assert_eq!(
            matches.get_one::<i64>("access-token-ttl-seconds").copied(),
            Some(3600)
        );
        assert_eq!(
            matches.get_one::<i64>("refresh-token-ttl-seconds").copied(),
            Some(2_592_000)
        );
        assert_eq!(
            matches.get_one::<usize>("max-sessions-per-user").copied(),
            Some(5)
        );
        assert!(!matches.get_flag("production"));
    }

    #[test]
    fn flags_override_defaults() {
        let matches = matches_with_base_env(vec![
            "portero",
            "--port",
            "9090",
            "--max-sessions-per-user",
            "2",
            "--production",
        ]);
        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
        assert_eq!(
            matches.get_one::<usize>("max-sessions-per-user").copied(),
            Some(2)
        );
        assert!(matches.get_flag("production"));
    }
}
