//! Signed access/refresh tokens.
//!
//! Both token kinds are HMAC-signed JWTs carrying a `type` claim. Decoding
//! always names the expected kind so an access token can never stand in for a
//! refresh token and vice versa.

use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::error::{AuthError, Result};

pub const DEFAULT_ALGORITHM: &str = "HS256";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Present on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Auth session id, present on refresh tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<Uuid>,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id
    pub jti: Uuid,
}

impl Claims {
    /// Session id of a refresh token.
    ///
    /// # Errors
    /// Returns `InvalidToken` when the claim is missing.
    pub fn session_id(&self) -> Result<Uuid> {
        self.sid.ok_or(AuthError::InvalidToken)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Parse a signing algorithm name; only the HMAC family is accepted.
///
/// # Errors
/// Returns an error for unknown or asymmetric algorithms.
pub fn parse_algorithm(name: &str) -> anyhow::Result<Algorithm> {
    let algorithm = Algorithm::from_str(name.trim().to_uppercase().as_str())
        .map_err(|e| anyhow!("unknown JWT algorithm {name}: {e}"))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => Err(anyhow!("unsupported JWT algorithm {other:?}, expected HS256/HS384/HS512")),
    }
}

/// Unsalted SHA-256 of a raw token, used for equality lookups in storage.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(
        secret: &SecretString,
        algorithm: Algorithm,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue a short-lived access token.
    ///
    /// # Errors
    /// Returns an internal error if signing fails.
    pub fn issue_access(&self, user_id: Uuid, email: &str) -> Result<IssuedToken> {
        self.issue(
            user_id,
            Some(email.to_string()),
            None,
            TokenType::Access,
            self.access_ttl,
        )
    }

    /// Issue a refresh token bound to an auth session.
    ///
    /// # Errors
    /// Returns an internal error if signing fails.
    pub fn issue_refresh(&self, user_id: Uuid, session_id: Uuid) -> Result<IssuedToken> {
        self.issue(
            user_id,
            None,
            Some(session_id),
            TokenType::Refresh,
            self.refresh_ttl,
        )
    }

    fn issue(
        &self,
        user_id: Uuid,
        email: Option<String>,
        sid: Option<Uuid>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .context("token lifetime out of range")?;
        let claims = Claims {
            sub: user_id,
            email,
            sid,
            token_type,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .context("failed to sign token")?;

        Ok(IssuedToken {
            token,
            token_id: claims.jti,
            expires_at,
        })
    }

    /// Verify signature, expiry and type.
    ///
    /// # Errors
    /// Returns `InvalidToken` on any verification failure.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims> {
        self.decode_with(token, expected, true)
    }

    /// Verify signature and type but accept expired tokens.
    ///
    /// Logout uses this so a stale refresh token can still retire its session.
    ///
    /// # Errors
    /// Returns `InvalidToken` on signature or type failure.
    pub fn decode_allow_expired(&self, token: &str, expected: TokenType) -> Result<Claims> {
        self.decode_with(token, expected, false)
    }

    fn decode_with(&self, token: &str, expected: TokenType, check_exp: bool) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = check_exp;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!("token rejected: {:?}", e.kind());
                AuthError::InvalidToken
            })?
            .claims;

        if claims.token_type != expected {
            debug!(
                "token rejected: expected {:?}, got {:?}",
                expected, claims.token_type
            );
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("keys", &"***")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}
