//! Redis backed refresh token index.

use ::redis::{aio::ConnectionManager, AsyncCommands, Client};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use super::{refresh_key, TokenIndex};

#[derive(Clone)]
pub struct RedisTokenIndex {
    manager: ConnectionManager,
}

impl RedisTokenIndex {
    /// Connect and keep a managed, auto-reconnecting connection.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = Client::open(url).context("invalid Redis URL")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;
        Ok(Self { manager })
    }
}

impl std::fmt::Debug for RedisTokenIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTokenIndex").finish_non_exhaustive()
    }
}

fn parse_session_id(key: &str, value: Option<String>) -> Option<Uuid> {
    let value = value?;
    match Uuid::parse_str(&value) {
        Ok(session_id) => Some(session_id),
        Err(err) => {
            warn!("ignoring malformed index entry {key}: {err}");
            None
        }
    }
}

#[async_trait]
impl TokenIndex for RedisTokenIndex {
    async fn put(&self, token_id: Uuid, session_id: Uuid, ttl: Duration) -> anyhow::Result<()> {
        let key = refresh_key(token_id);
        let seconds = ttl.as_secs().max(1);
        let span = info_span!("redis.command", db.system = "redis", db.operation = "SET");
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(&key, session_id.to_string(), seconds)
            .instrument(span)
            .await
            .context("failed to index refresh token")
    }

    async fn get(&self, token_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let key = refresh_key(token_id);
        let span = info_span!("redis.command", db.system = "redis", db.operation = "GET");
        let mut conn = self.manager.clone();
        let value: Option<String> = conn
            .get(&key)
            .instrument(span)
            .await
            .context("failed to read refresh token index")?;
        Ok(parse_session_id(&key, value))
    }

    async fn take(&self, token_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let key = refresh_key(token_id);
        let span = info_span!("redis.command", db.system = "redis", db.operation = "GETDEL");
        let mut conn = self.manager.clone();
        let value: Option<String> = ::redis::cmd("GETDEL")
            .arg(&key)
            .query_async(&mut conn)
            .instrument(span)
            .await
            .context("failed to consume refresh token index entry")?;
        Ok(parse_session_id(&key, value))
    }

    async fn remove(&self, token_id: Uuid) -> anyhow::Result<bool> {
        let key = refresh_key(token_id);
        let span = info_span!("redis.command", db.system = "redis", db.operation = "DEL");
        let mut conn = self.manager.clone();
        let removed: i64 = conn
            .del(&key)
            .instrument(span)
            .await
            .context("failed to delete refresh token index entry")?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let span = info_span!("redis.command", db.system = "redis", db.operation = "PING");
        let mut conn = self.manager.clone();
        let _: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .instrument(span)
            .await
            .context("failed to ping Redis")?;
        Ok(())
    }
}
