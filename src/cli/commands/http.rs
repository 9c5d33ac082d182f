use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::auth::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECONDS};

pub const ARG_CORS_ORIGIN: &str = "cors-origin";
pub const ARG_RATE_LIMIT_WINDOW_SECONDS: &str = "rate-limit-window-seconds";
pub const ARG_RATE_LIMIT_MAX_REQUESTS: &str = "rate-limit-max-requests";
pub const ARG_TRUST_PROXY_HEADERS: &str = "trust-proxy-headers";

#[derive(Debug)]
pub struct Options {
    pub cors_origins: Vec<String>,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_max_requests: u32,
    pub trust_proxy_headers: bool,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            cors_origins: matches
                .get_many::<String>(ARG_CORS_ORIGIN)
                .map(|values| {
                    values
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit_window_seconds: matches
                .get_one::<u64>(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_WINDOW_SECONDS),
            rate_limit_max_requests: matches
                .get_one::<u32>(ARG_RATE_LIMIT_MAX_REQUESTS)
                .copied()
                .unwrap_or(DEFAULT_MAX_REQUESTS),
            trust_proxy_headers: matches.get_flag(ARG_TRUST_PROXY_HEADERS),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Allowed CORS origin, repeat or comma separate for several, * for any")
                .env("MOODSYNC_CORS_ORIGINS")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .long(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .help("Rate limit window in seconds for register and login")
                .env("MOODSYNC_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_MAX_REQUESTS)
                .long(ARG_RATE_LIMIT_MAX_REQUESTS)
                .help("Requests allowed per client IP within a window")
                .env("MOODSYNC_RATE_LIMIT_MAX_REQUESTS")
                .default_value("100")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_TRUST_PROXY_HEADERS)
                .long(ARG_TRUST_PROXY_HEADERS)
                .help("Take the client IP from X-Forwarded-For and X-Real-IP, only behind a trusted proxy")
                .env("MOODSYNC_TRUST_PROXY_HEADERS")
                .action(ArgAction::SetTrue),
        )
}
