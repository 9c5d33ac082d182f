//! Process-wide token settings, fixed after startup.

use anyhow::{bail, Result};
use chrono::Duration;
use jsonwebtoken::Algorithm;
use secrecy::{ExposeSecret, SecretString};

use super::token::TokenCodec;

pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 14;
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    jwt_algorithm: Algorithm,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            jwt_algorithm: Algorithm::HS256,
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
        }
    }

    #[must_use]
    pub fn with_jwt_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.jwt_algorithm = algorithm;
        self
    }

    /// Out of range values saturate and are rejected by [`Self::validate`].
    #[must_use]
    pub fn with_access_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_token_ttl = Duration::try_minutes(minutes).unwrap_or(Duration::MAX);
        self
    }

    /// Out of range values saturate and are rejected by [`Self::validate`].
    #[must_use]
    pub fn with_refresh_token_ttl_days(mut self, days: i64) -> Self {
        self.refresh_token_ttl = Duration::try_days(days).unwrap_or(Duration::MAX);
        self
    }

    #[must_use]
    pub fn jwt_algorithm(&self) -> Algorithm {
        self.jwt_algorithm
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    /// # Errors
    /// Returns an error if the secret is empty or a lifetime is not positive
    /// or above its maximum.
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.expose_secret().trim().is_empty() {
            bail!("JWT secret must not be empty");
        }
        if self.access_token_ttl <= Duration::zero() {
            bail!("access token TTL must be positive");
        }
        if self.access_token_ttl > Duration::minutes(MAX_ACCESS_TOKEN_TTL_MINUTES) {
            bail!("access token TTL must be at most {MAX_ACCESS_TOKEN_TTL_MINUTES} minutes");
        }
        if self.refresh_token_ttl <= Duration::zero() {
            bail!("refresh token TTL must be positive");
        }
        if self.refresh_token_ttl > Duration::days(MAX_REFRESH_TOKEN_TTL_DAYS) {
            bail!("refresh token TTL must be at most {MAX_REFRESH_TOKEN_TTL_DAYS} days");
        }
        Ok(())
    }

    #[must_use]
    pub fn codec(&self) -> TokenCodec {
        TokenCodec::new(
            &self.jwt_secret,
            self.jwt_algorithm,
            self.access_token_ttl,
            self.refresh_token_ttl,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::new(SecretString::from("secret"));
        assert_eq!(config.jwt_algorithm(), Algorithm::HS256);
        assert_eq!(config.access_token_ttl(), Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl(), Duration::days(14));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let config = AuthConfig::new(SecretString::from("secret"))
            .with_jwt_algorithm(Algorithm::HS512)
            .with_access_token_ttl_minutes(5)
            .with_refresh_token_ttl_days(1);
        assert_eq!(config.jwt_algorithm(), Algorithm::HS512);
        assert_eq!(config.access_token_ttl(), Duration::minutes(5));
        assert_eq!(config.refresh_token_ttl(), Duration::days(1));
        assert_eq!(config.codec().refresh_ttl(), Duration::days(1));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(AuthConfig::new(SecretString::from("  "))
            .validate()
            .is_err());
        assert!(AuthConfig::new(SecretString::from("secret"))
            .with_access_token_ttl_minutes(0)
            .validate()
            .is_err());
        assert!(AuthConfig::new(SecretString::from("secret"))
            .with_refresh_token_ttl_days(-1)
            .validate()
            .is_err());
    }

    #[test]
    fn validate_rejects_oversized_lifetimes() {
        let secret = || SecretString::from("secret");
        assert!(AuthConfig::new(secret())
            .with_access_token_ttl_minutes(MAX_ACCESS_TOKEN_TTL_MINUTES)
            .with_refresh_token_ttl_days(MAX_REFRESH_TOKEN_TTL_DAYS)
            .validate()
            .is_ok());
        assert!(AuthConfig::new(secret())
            .with_access_token_ttl_minutes(MAX_ACCESS_TOKEN_TTL_MINUTES + 1)
            .validate()
            .is_err());
        assert!(AuthConfig::new(secret())
            .with_refresh_token_ttl_days(MAX_REFRESH_TOKEN_TTL_DAYS + 1)
            .validate()
            .is_err());

        // too large for a duration at all
        let config = AuthConfig::new(secret())
            .with_access_token_ttl_minutes(i64::MAX)
            .with_refresh_token_ttl_days(100_000_000);
        assert_eq!(config.access_token_ttl(), Duration::MAX);
        assert_eq!(config.refresh_token_ttl(), Duration::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let config = AuthConfig::new(SecretString::from("very-secret"));
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
