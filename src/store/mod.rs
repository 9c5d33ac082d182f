//! Persistence seams used by the auth service.
//!
//! Users and auth sessions live in `PostgreSQL`; refresh token ids are indexed
//! in Redis with a TTL. Every trait also has an in-process implementation in
//! [`memory`] so the service can run without external dependencies.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{
    error::Result as AuthResult,
    model::{AuthSession, NewAuthSession, NewUser, User},
};

pub mod memory;
pub mod postgres;
pub mod redis;

/// Key under which a refresh token id is indexed.
#[must_use]
pub fn refresh_key(token_id: Uuid) -> String {
    format!("refresh:{token_id}")
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    /// Returns `AuthError::Conflict` if the email is already registered.
    async fn create(&self, user: NewUser) -> AuthResult<User>;

    async fn get_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn get_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<User>>;

    /// Returns `false` if no such user exists.
    async fn set_onboarded(&self, user_id: Uuid) -> anyhow::Result<bool>;

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: NewAuthSession) -> anyhow::Result<AuthSession>;

    async fn get(&self, session_id: Uuid) -> anyhow::Result<Option<AuthSession>>;

    /// Mark a session revoked. Idempotent; returns `true` only on the transition.
    async fn revoke(&self, session_id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait TokenIndex: Send + Sync {
    async fn put(&self, token_id: Uuid, session_id: Uuid, ttl: Duration) -> anyhow::Result<()>;

    async fn get(&self, token_id: Uuid) -> anyhow::Result<Option<Uuid>>;

    /// Read and delete in one step. Of two concurrent callers at most one sees the entry.
    async fn take(&self, token_id: Uuid) -> anyhow::Result<Option<Uuid>>;

    /// Returns whether an entry was present.
    async fn remove(&self, token_id: Uuid) -> anyhow::Result<bool>;

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            refresh_key(id),
            "refresh:00000000-0000-0000-0000-000000000000"
        );
    }
}
