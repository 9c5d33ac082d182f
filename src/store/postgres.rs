//! `PostgreSQL` backed user directory and session store.
//!
//! Schema lives in `sql/schema.sql`.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{SessionStore, UserDirectory};
use crate::auth::{
    error::{AuthError, Result as AuthResult},
    model::{AuthSession, DeviceInfo, NewAuthSession, NewUser, User},
};

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        has_onboarded: row.try_get("has_onboarded")?,
        is_active: row.try_get("is_active")?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<AuthSession, sqlx::Error> {
    Ok(AuthSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        refresh_token_hash: row.try_get("refresh_token_hash")?,
        device: DeviceInfo {
            device_name: row.try_get("device_name")?,
            device_id: row.try_get("device_id")?,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
        },
        is_revoked: row.try_get("is_revoked")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

#[derive(Clone, Debug)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, user: NewUser) -> AuthResult<User> {
        let query = r"
            INSERT INTO users (email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, email, password_hash, first_name, last_name,
                      has_onboarded, is_active, is_verified, created_at, updated_at
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(user_from_row(&row).context("failed to decode user row")?),
            Err(err) if is_unique_violation(&err) => Err(AuthError::Conflict),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }

    async fn get_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let query = r"
            SELECT user_id, email, password_hash, first_name, last_name,
                   has_onboarded, is_active, is_verified, created_at, updated_at
            FROM users
            WHERE email = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user row")
    }

    async fn get_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        let query = r"
            SELECT user_id, email, password_hash, first_name, last_name,
                   has_onboarded, is_active, is_verified, created_at, updated_at
            FROM users
            WHERE user_id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user row")
    }

    async fn set_onboarded(&self, user_id: Uuid) -> anyhow::Result<bool> {
        let query =
            "UPDATE users SET has_onboarded = TRUE, updated_at = NOW() WHERE user_id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark user onboarded")?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: NewAuthSession) -> anyhow::Result<AuthSession> {
        let query = r"
            INSERT INTO auth_sessions
                (id, user_id, refresh_token_hash, device_name, device_id, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, refresh_token_hash, device_name, device_id, ip_address,
                      user_agent, is_revoked, expires_at, created_at, revoked_at
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(session.id)
            .bind(session.user_id)
            .bind(&session.refresh_token_hash)
            .bind(&session.device.device_name)
            .bind(&session.device.device_id)
            .bind(&session.device.ip_address)
            .bind(&session.device.user_agent)
            .bind(session.expires_at)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert auth session")?;

        session_from_row(&row).context("failed to decode auth session row")
    }

    async fn get(&self, session_id: Uuid) -> anyhow::Result<Option<AuthSession>> {
        let query = r"
            SELECT id, user_id, refresh_token_hash, device_name, device_id, ip_address,
                   user_agent, is_revoked, expires_at, created_at, revoked_at
            FROM auth_sessions
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup auth session")?;

        row.as_ref()
            .map(session_from_row)
            .transpose()
            .context("failed to decode auth session row")
    }

    async fn revoke(&self, session_id: Uuid) -> anyhow::Result<bool> {
        let query = r"
            UPDATE auth_sessions
            SET is_revoked = TRUE, revoked_at = NOW()
            WHERE id = $1 AND is_revoked = FALSE
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(session_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to revoke auth session")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("40001"),
        }));
        assert!(!is_unique_violation(&err));

        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
