use clap::{Arg, ArgMatches, Command};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;

use crate::auth::{
    config::{
        DEFAULT_ACCESS_TOKEN_TTL_MINUTES, DEFAULT_REFRESH_TOKEN_TTL_DAYS,
        MAX_ACCESS_TOKEN_TTL_MINUTES, MAX_REFRESH_TOKEN_TTL_DAYS,
    },
    token::{parse_algorithm, DEFAULT_ALGORITHM},
};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_ALGORITHM: &str = "jwt-algorithm";
pub const ARG_ACCESS_TOKEN_TTL_MINUTES: &str = "access-token-ttl-minutes";
pub const ARG_REFRESH_TOKEN_TTL_DAYS: &str = "refresh-token-ttl-days";

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub jwt_algorithm: Algorithm,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
}

impl Options {
    /// Parse token arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret is empty or the algorithm is not supported.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let jwt_secret = match matches.get_one::<String>(ARG_JWT_SECRET) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.clone()),
            _ => anyhow::bail!("missing required argument: --{ARG_JWT_SECRET}"),
        };

        let jwt_algorithm = parse_algorithm(
            matches
                .get_one::<String>(ARG_JWT_ALGORITHM)
                .map_or(DEFAULT_ALGORITHM, String::as_str),
        )?;

        Ok(Self {
            jwt_secret,
            jwt_algorithm,
            access_token_ttl_minutes: matches
                .get_one::<i64>(ARG_ACCESS_TOKEN_TTL_MINUTES)
                .copied()
                .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            refresh_token_ttl_days: matches
                .get_one::<i64>(ARG_REFRESH_TOKEN_TTL_DAYS)
                .copied()
                .unwrap_or(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign access and refresh tokens")
                .env("MOODSYNC_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_ALGORITHM)
                .long(ARG_JWT_ALGORITHM)
                .help("Token signing algorithm: HS256, HS384 or HS512")
                .env("MOODSYNC_JWT_ALGORITHM")
                .default_value(DEFAULT_ALGORITHM),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_MINUTES)
                .long(ARG_ACCESS_TOKEN_TTL_MINUTES)
                .help("Access token lifetime in minutes")
                .env("MOODSYNC_ACCESS_TOKEN_TTL_MINUTES")
                .default_value("15")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_ACCESS_TOKEN_TTL_MINUTES)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL_DAYS)
                .long(ARG_REFRESH_TOKEN_TTL_DAYS)
                .help("Refresh token and session lifetime in days")
                .env("MOODSYNC_REFRESH_TOKEN_TTL_DAYS")
                .default_value("14")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_REFRESH_TOKEN_TTL_DAYS)),
        )
}
