//! Backing store tests against live services.
//!
//! Run with `MOODSYNC_TEST_DSN` and `MOODSYNC_TEST_REDIS_URL` set, e.g.
//! `cargo test --test stores -- --ignored`.

use anyhow::{Context, Result};
use moodsync::{
    auth::{model::DeviceInfo, AuthConfig, AuthError, AuthService},
    store::{
        postgres::{PgSessionStore, PgUserDirectory},
        redis::RedisTokenIndex,
        SessionStore, TokenIndex, UserDirectory,
    },
};
use secrecy::SecretString;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

async fn pool() -> Result<PgPool> {
    let dsn = std::env::var("MOODSYNC_TEST_DSN").context("MOODSYNC_TEST_DSN not set")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;
    sqlx::raw_sql(include_str!("../sql/schema.sql"))
        .execute(&pool)
        .await
        .context("Failed to apply schema")?;
    Ok(pool)
}

async fn redis() -> Result<RedisTokenIndex> {
    let url = std::env::var("MOODSYNC_TEST_REDIS_URL").context("MOODSYNC_TEST_REDIS_URL not set")?;
    RedisTokenIndex::connect(&url).await
}

fn unique_email() -> String {
    format!("{}@moodsync.test", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn postgres_user_directory() -> Result<()> {
    let users = PgUserDirectory::new(pool().await?);
    let email = unique_email();

    let user = users
        .create(moodsync::auth::model::NewUser {
            email: email.clone(),
            password_hash: "hash".to_string(),
            first_name: Some("Pat".to_string()),
            last_name: None,
        })
        .await?;
    assert!(!user.has_onboarded);
    assert!(user.is_active);

    let duplicate = users
        .create(moodsync::auth::model::NewUser {
            email: email.clone(),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
        })
        .await;
    assert!(matches!(duplicate, Err(AuthError::Conflict)));

    let found = users.get_by_email(&email).await?;
    assert_eq!(found.map(|u| u.user_id), Some(user.user_id));

    assert!(users.set_onboarded(user.user_id).await?);
    assert!(!users.set_onboarded(Uuid::new_v4()).await?);
    let reloaded = users.get_by_id(user.user_id).await?;
    assert_eq!(reloaded.map(|u| u.has_onboarded), Some(true));

    users.ping().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn postgres_session_revoke_is_idempotent() -> Result<()> {
    let pool = pool().await?;
    let users = PgUserDirectory::new(pool.clone());
    let sessions = PgSessionStore::new(pool);

    let user = users
        .create(moodsync::auth::model::NewUser {
            email: unique_email(),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
        })
        .await?;

    let session = sessions
        .create(moodsync::auth::model::NewAuthSession {
            id: Uuid::new_v4(),
            user_id: user.user_id,
            refresh_token_hash: Uuid::new_v4().simple().to_string(),
            device: DeviceInfo {
                device_name: Some("laptop".to_string()),
                ..DeviceInfo::default()
            },
            expires_at: chrono::Utc::now() + chrono::Duration::days(1),
        })
        .await?;
    assert!(!session.is_revoked);
    assert_eq!(session.device.device_name.as_deref(), Some("laptop"));

    assert!(sessions.revoke(session.id).await?);
    assert!(!sessions.revoke(session.id).await?);

    let stored = sessions.get(session.id).await?.context("session missing")?;
    assert!(stored.is_revoked);
    assert!(stored.revoked_at.is_some());
    Ok(())
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn redis_take_is_single_use() -> Result<()> {
    let index = redis().await?;
    let token_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();

    index
        .put(token_id, session_id, Duration::from_secs(60))
        .await?;
    assert_eq!(index.get(token_id).await?, Some(session_id));
    assert_eq!(index.take(token_id).await?, Some(session_id));
    assert_eq!(index.take(token_id).await?, None);
    assert!(!index.remove(token_id).await?);

    index.ping().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL and Redis"]
async fn service_rotation_against_live_stores() -> Result<()> {
    let pool = pool().await?;
    let config = AuthConfig::new(SecretString::from("live-store-secret".to_string()));
    let service = AuthService::new(
        &config,
        Arc::new(PgUserDirectory::new(pool.clone())),
        Arc::new(PgSessionStore::new(pool)),
        Arc::new(redis().await?),
    );

    let email = unique_email();
    let registered = service.register(&email, "password123", None, None).await?;
    let rotated = service.refresh(&registered.refresh_token).await?;
    assert_ne!(rotated.session_id, registered.session_id);

    let replay = service.refresh(&registered.refresh_token).await;
    assert!(matches!(replay, Err(AuthError::Unauthorized)));

    service.logout(&rotated.refresh_token).await?;
    service.logout(&rotated.refresh_token).await?;

    assert_eq!(service.dependency_status().await, (true, true));
    Ok(())
}
