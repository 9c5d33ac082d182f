//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action to run, here starting the API
//! server with its full configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, http, storage, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8000);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let storage_opts = storage::Options::parse(matches);
    let auth_opts = auth::Options::parse(matches)?;
    let http_opts = http::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        redis_url: storage_opts.redis_url,
        jwt_secret: auth_opts.jwt_secret,
        jwt_algorithm: auth_opts.jwt_algorithm,
        access_token_ttl_minutes: auth_opts.access_token_ttl_minutes,
        refresh_token_ttl_days: auth_opts.refresh_token_ttl_days,
        cors_origins: http_opts.cors_origins,
        rate_limit_window_seconds: http_opts.rate_limit_window_seconds,
        rate_limit_max_requests: http_opts.rate_limit_max_requests,
        trust_proxy_headers: http_opts.trust_proxy_headers,
    }))
}
