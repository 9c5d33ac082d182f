//! In-process stores for tests and single-node runs.

use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{SessionStore, TokenIndex, UserDirectory};
use crate::auth::{
    error::{AuthError, Result as AuthResult},
    model::{AuthSession, NewAuthSession, NewUser, User},
};

#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user record outright. Returns whether it existed.
    pub async fn delete(&self, user_id: Uuid) -> bool {
        self.users.write().await.remove(&user_id).is_some()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn create(&self, user: NewUser) -> AuthResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::Conflict);
        }

        let now = Utc::now();
        let record = User {
            user_id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            has_onboarded: false,
            is_active: true,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.user_id, record.clone());
        Ok(record)
    }

    async fn get_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn set_onboarded(&self, user_id: Uuid) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) => {
                user.has_onboarded = true;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, AuthSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions of a user, oldest first.
    pub async fn sessions_for_user(&self, user_id: Uuid) -> Vec<AuthSession> {
        let mut sessions: Vec<AuthSession> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: NewAuthSession) -> anyhow::Result<AuthSession> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            anyhow::bail!("auth session {} already exists", session.id);
        }
        if sessions
            .values()
            .any(|s| s.refresh_token_hash == session.refresh_token_hash)
        {
            anyhow::bail!("refresh token hash already stored");
        }

        let record = AuthSession {
            id: session.id,
            user_id: session.user_id,
            refresh_token_hash: session.refresh_token_hash,
            device: session.device,
            is_revoked: false,
            expires_at: session.expires_at,
            created_at: Utc::now(),
            revoked_at: None,
        };
        sessions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, session_id: Uuid) -> anyhow::Result<Option<AuthSession>> {
        Ok(self.sessions.read().await.get(&session_id).cloned())
    }

    async fn revoke(&self, session_id: Uuid) -> anyhow::Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(session) if !session.is_revoked => {
                session.is_revoked = true;
                session.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenIndex {
    entries: Mutex<HashMap<Uuid, (Uuid, Instant)>>,
}

impl MemoryTokenIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry, as if the backing cache had been flushed.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TokenIndex for MemoryTokenIndex {
    async fn put(&self, token_id: Uuid, session_id: Uuid, ttl: Duration) -> anyhow::Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, deadline)| *deadline > now);
        entries.insert(token_id, (session_id, now + ttl));
        Ok(())
    }

    async fn get(&self, token_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .get(&token_id)
            .filter(|(_, deadline)| *deadline > now)
            .map(|(session_id, _)| *session_id))
    }

    async fn take(&self, token_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .remove(&token_id)
            .filter(|(_, deadline)| *deadline > now)
            .map(|(session_id, _)| session_id))
    }

    async fn remove(&self, token_id: Uuid) -> anyhow::Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .remove(&token_id)
            .is_some_and(|(_, deadline)| deadline > now))
    }
}
