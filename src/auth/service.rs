//! Auth session lifecycle: register, login, refresh rotation and logout.
//!
//! Flow Overview:
//! 1) Register/login verify credentials and issue a token pair. The refresh
//!    token is bound to a fresh auth session whose row stores only the token
//!    fingerprint, and its `jti` is indexed with the refresh lifetime as TTL.
//! 2) Refresh consumes the index entry first. Whoever takes it owns the
//!    rotation; a concurrent or replayed refresh finds nothing and gets 401.
//!    The winner checks the session row, revokes it, then issues a new pair
//!    under a new session.
//! 3) Logout drops the index entry and revokes the session, even when the
//!    refresh token has already expired.
//!
//! Once an index entry has been consumed the remaining steps run on a spawned
//! task, so dropping the caller's future cannot leave a half-rotated lineage.

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
    config::AuthConfig,
    error::{AuthError, Result},
    model::{AuthTokens, DeviceInfo, NewAuthSession, NewUser, User},
    password,
    token::{fingerprint, Claims, TokenCodec, TokenType},
};
use crate::store::{SessionStore, TokenIndex, UserDirectory};

#[derive(Clone)]
pub struct AuthService {
    codec: Arc<TokenCodec>,
    users: Arc<dyn UserDirectory>,
    sessions: Arc<dyn SessionStore>,
    index: Arc<dyn TokenIndex>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

/// Remaining lifetime of a token as an index TTL, never below one second.
fn index_ttl(expires_at: DateTime<Utc>) -> Duration {
    (expires_at - Utc::now())
        .to_std()
        .unwrap_or(Duration::ZERO)
        .max(Duration::from_secs(1))
}

/// Digest checked when the email is unknown.
fn decoy_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| password::hash_password("moodsync-decoy-password").ok())
        .as_deref()
}

async fn hash_password(plain: &str) -> Result<String> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .context("password hashing task failed")?
}

async fn verify_password(plain: &str, digest: Option<String>) -> Result<bool> {
    let plain = plain.to_string();
    let verified = tokio::task::spawn_blocking(move || match digest {
        Some(digest) => password::verify_password(&plain, &digest),
        None => {
            if let Some(decoy) = decoy_hash() {
                let _ = password::verify_password(&plain, decoy);
            }
            false
        }
    })
    .await
    .context("password verification task failed")?;
    Ok(verified)
}

impl AuthService {
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserDirectory>,
        sessions: Arc<dyn SessionStore>,
        index: Arc<dyn TokenIndex>,
    ) -> Self {
        Self {
            codec: Arc::new(config.codec()),
            users,
            sessions,
            index,
        }
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Report whether the user directory and the token index are reachable.
    pub async fn dependency_status(&self) -> (bool, bool) {
        let (database, index) = tokio::join!(self.users.ping(), self.index.ping());
        if let Err(err) = &database {
            warn!("user directory unavailable: {err:#}");
        }
        if let Err(err) = &index {
            warn!("token index unavailable: {err:#}");
        }
        (database.is_ok(), index.is_ok())
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    /// `Conflict` if the email is taken; `Internal` on storage failures.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<AuthTokens> {
        if self.users.get_by_email(email).await?.is_some() {
            debug!("registration rejected: email already registered");
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_password(password).await?;
        let user = self
            .users
            .create(NewUser {
                email: email.to_string(),
                password_hash,
                first_name,
                last_name,
            })
            .await?;

        debug!(user_id = %user.user_id, "user registered");

        self.issue_tokens(&user, DeviceInfo::default()).await
    }

    /// Verify credentials and open a new session.
    ///
    /// Unknown email and wrong password fail identically.
    ///
    /// # Errors
    /// `Unauthorized` on bad credentials; `Internal` on storage failures.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str, device: DeviceInfo) -> Result<AuthTokens> {
        let user = self.users.get_by_email(email).await?;
        let digest = user.as_ref().map(|u| u.password_hash.clone());

        let verified = verify_password(password, digest).await?;
        let Some(user) = user.filter(|_| verified) else {
            debug!("login rejected: invalid credentials");
            return Err(AuthError::Unauthorized);
        };

        self.issue_tokens(&user, device).await
    }

    /// Rotate a refresh token.
    ///
    /// # Errors
    /// `InvalidToken` if the token does not decode as a live refresh token;
    /// `Unauthorized` if it was already used, revoked, or does not match its session.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens> {
        let claims = self.codec.decode(refresh_token, TokenType::Refresh)?;
        let session_id = claims.session_id()?;

        match self.index.take(claims.jti).await? {
            Some(indexed) if indexed == session_id => {}
            Some(indexed) => {
                warn!(%session_id, %indexed, "refresh token indexed under another session");
                return Err(AuthError::Unauthorized);
            }
            None => {
                debug!(%session_id, "refresh rejected: token not indexed");
                return Err(AuthError::Unauthorized);
            }
        }

        let this = self.clone();
        let token_hash = fingerprint(refresh_token);
        tokio::spawn(async move { this.rotate(claims, session_id, token_hash).await })
            .await
            .context("refresh task failed")?
    }

    async fn rotate(&self, claims: Claims, session_id: Uuid, token_hash: String) -> Result<AuthTokens> {
        let Some(session) = self.sessions.get(session_id).await? else {
            debug!(%session_id, "refresh rejected: unknown session");
            return Err(AuthError::Unauthorized);
        };

        if !session.is_active_at(Utc::now()) || session.user_id != claims.sub {
            debug!(%session_id, revoked = session.is_revoked, "refresh rejected: session not active");
            return Err(AuthError::Unauthorized);
        }

        if session.refresh_token_hash != token_hash {
            warn!(%session_id, "refresh rejected: token does not match session");
            return Err(AuthError::Unauthorized);
        }

        let user = self
            .users
            .get_by_id(claims.sub)
            .await?
            .ok_or(AuthError::NotFound)
            .map_err(AuthError::hide_not_found)?;

        self.sessions.revoke(session_id).await?;
        let tokens = self.issue_tokens(&user, DeviceInfo::default()).await?;

        debug!(
            user_id = %user.user_id,
            old_session = %session_id,
            new_session = %tokens.session_id,
            "refresh token rotated"
        );

        Ok(tokens)
    }

    /// Retire the session behind a refresh token. Safe to repeat.
    ///
    /// # Errors
    /// `InvalidToken` if the token is not a refresh token signed by us.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let claims = self
            .codec
            .decode_allow_expired(refresh_token, TokenType::Refresh)?;
        let session_id = claims.session_id()?;

        let this = self.clone();
        tokio::spawn(async move {
            let indexed = this.index.remove(claims.jti).await?;
            let revoked = this.sessions.revoke(session_id).await?;
            debug!(%session_id, indexed, revoked, "logged out");
            Ok::<(), AuthError>(())
        })
        .await
        .context("logout task failed")?
    }

    /// Resolve an access token to its user.
    ///
    /// # Errors
    /// `InvalidToken` for a bad token; `NotFound` if the user no longer exists.
    pub async fn current_user(&self, access_token: &str) -> Result<User> {
        let claims = self.codec.decode(access_token, TokenType::Access)?;
        self.users
            .get_by_id(claims.sub)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// # Errors
    /// `NotFound` if the user no longer exists.
    pub async fn complete_onboarding(&self, user_id: Uuid) -> Result<()> {
        if self.users.set_onboarded(user_id).await? {
            debug!(%user_id, "onboarding completed");
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }

    async fn issue_tokens(&self, user: &User, device: DeviceInfo) -> Result<AuthTokens> {
        let access = self.codec.issue_access(user.user_id, &user.email)?;
        let session_id = Uuid::new_v4();
        let refresh = self.codec.issue_refresh(user.user_id, session_id)?;

        let session = self
            .sessions
            .create(NewAuthSession {
                id: session_id,
                user_id: user.user_id,
                refresh_token_hash: fingerprint(&refresh.token),
                device,
                expires_at: refresh.expires_at,
            })
            .await?;

        self.index
            .put(refresh.token_id, session.id, index_ttl(refresh.expires_at))
            .await?;

        debug!(user_id = %user.user_id, session_id = %session.id, "token pair issued");

        Ok(AuthTokens {
            user_id: user.user_id,
            session_id: session.id,
            access_token: access.token,
            refresh_token: refresh.token,
            expires_at: access.expires_at,
            has_onboarded: user.has_onboarded,
        })
    }
}
