use crate::{
    api,
    auth::{AuthConfig, IpRateLimiter},
};
use anyhow::Result;
use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: Option<String>,
    pub jwt_secret: SecretString,
    pub jwt_algorithm: Algorithm,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub cors_origins: Vec<String>,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_max_requests: u32,
    pub trust_proxy_headers: bool,
}

/// Connection string with username and password removed, for logging.
#[must_use]
pub fn redact_dsn(dsn: &str) -> String {
    let Ok(mut url) = Url::parse(dsn) else {
        return "<unparseable dsn>".to_string();
    };

    // Both setters only fail for URLs without a host.
    let _ = url.set_password(None);
    let _ = url.set_username("");

    url.to_string()
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        dsn = %redact_dsn(&args.dsn),
        redis = %args.redis_url.as_deref().map_or_else(|| "memory".to_string(), redact_dsn),
        "Starting {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let auth_config = AuthConfig::new(args.jwt_secret)
        .with_jwt_algorithm(args.jwt_algorithm)
        .with_access_token_ttl_minutes(args.access_token_ttl_minutes)
        .with_refresh_token_ttl_days(args.refresh_token_ttl_days);

    debug!("Auth config: {:?}", auth_config);

    let rate_limiter = Arc::new(IpRateLimiter::new(
        Duration::from_secs(args.rate_limit_window_seconds),
        args.rate_limit_max_requests,
    )?);

    if args.trust_proxy_headers {
        info!("Client IPs are taken from proxy headers");
    }

    api::new(api::ServerConfig {
        port: args.port,
        dsn: args.dsn,
        redis_url: args.redis_url,
        auth_config,
        cors_origins: args.cors_origins,
        rate_limiter,
        trust_proxy_headers: args.trust_proxy_headers,
    })
    .await
}
