use clap::{Arg, Command};

use crate::auth::{DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS, PasswordScheme};

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_PASSWORD_SCHEME: &str = "password-scheme";
pub const ARG_CORS_ALLOW_ORIGIN: &str = "cors-allow-origin";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Bearer session validity in seconds")
                .env("TRIPMATE_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(
                    clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_SECONDS),
                ),
        )
        .arg(
            Arg::new(ARG_PASSWORD_SCHEME)
                .long(ARG_PASSWORD_SCHEME)
                .help("Password digest for new registrations: sha256 or argon2id")
                .env("TRIPMATE_PASSWORD_SCHEME")
                .default_value("sha256")
                .value_parser(|value: &str| value.parse::<PasswordScheme>()),
        )
        .arg(
            Arg::new(ARG_CORS_ALLOW_ORIGIN)
                .long(ARG_CORS_ALLOW_ORIGIN)
                .help("Allowed CORS origins, comma separated, or * for any")
                .env("TRIPMATE_CORS_ALLOW_ORIGIN")
                .default_value("*"),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub session_ttl_seconds: i64,
    pub password_scheme: PasswordScheme,
    pub cors_allow_origin: String,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &clap::ArgMatches) -> Self {
        Self {
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            password_scheme: matches
                .get_one::<PasswordScheme>(ARG_PASSWORD_SCHEME)
                .copied()
                .unwrap_or_default(),
            cors_allow_origin: matches
                .get_one::<String>(ARG_CORS_ALLOW_ORIGIN)
                .cloned()
                .unwrap_or_else(|| "*".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 3] = [
        "TRIPMATE_SESSION_TTL_SECONDS",
        "TRIPMATE_PASSWORD_SCHEME",
        "TRIPMATE_CORS_ALLOW_ORIGIN",
    ];

    #[test]
    fn defaults() {
        temp_env::with_vars_unset(VARS, || {
            let matches = with_args(Command::new("tripmate")).get_matches_from(["tripmate"]);
            let options = Options::parse(&matches);

            assert_eq!(options.session_ttl_seconds, 604_800);
            assert_eq!(options.password_scheme, PasswordScheme::Sha256);
            assert_eq!(options.cors_allow_origin, "*");
        });
    }

    #[test]
    fn env_overrides() {
        temp_env::with_vars(
            [
                ("TRIPMATE_SESSION_TTL_SECONDS", Some("3600")),
                ("TRIPMATE_PASSWORD_SCHEME", Some("argon2id")),
                ("TRIPMATE_CORS_ALLOW_ORIGIN", Some("https://tripmate.dev")),
            ],
            || {
                let matches = with_args(Command::new("tripmate")).get_matches_from(["tripmate"]);
                let options = Options::parse(&matches);

                assert_eq!(options.session_ttl_seconds, 3600);
                assert_eq!(options.password_scheme, PasswordScheme::Argon2id);
                assert_eq!(options.cors_allow_origin, "https://tripmate.dev");
            },
        );
    }

    #[test]
    fn rejects_unknown_scheme_and_zero_ttl() {
        temp_env::with_vars_unset(VARS, || {
            let command = with_args(Command::new("tripmate"));
            assert!(
                command
                    .clone()
                    .try_get_matches_from(["tripmate", "--password-scheme", "md5"])
                    .is_err()
            );
            assert!(
                command
                    .try_get_matches_from(["tripmate", "--session-ttl-seconds", "0"])
                    .is_err()
            );
        });
    }

    #[test]
    fn session_ttl_is_capped_at_ten_years() {
        temp_env::with_vars_unset(VARS, || {
            let command = with_args(Command::new("tripmate"));
            for too_long in ["315360001", "10000000000000", "9223372036854775807"] {
                assert!(
                    command
                        .clone()
                        .try_get_matches_from(["tripmate", "--session-ttl-seconds", too_long])
                        .is_err(),
                    "{too_long}"
                );
            }

            let matches = command
                .try_get_matches_from(["tripmate", "--session-ttl-seconds", "315360000"]);
            assert!(matches.is_ok_and(|matches| {
                Options::parse(&matches).session_ttl_seconds == MAX_SESSION_TTL_SECONDS
            }));
        });
    }
}
