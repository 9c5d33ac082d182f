//! Request/response types for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthTokens, User};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    /// 8 to 72 characters
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_name: Option<String>,
    pub device_id: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry
    pub expires_at: DateTime<Utc>,
    pub has_onboarded: bool,
}

impl From<AuthTokens> for AuthResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            user_id: tokens.user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
            has_onboarded: tokens.has_onboarded,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OnboardingResponse {
    pub success: bool,
    pub has_onboarded: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub has_onboarded: bool,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            has_onboarded: user.has_onboarded,
            is_active: user.is_active,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_optional_device_fields() -> Result<()> {
        let request: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw123456"}"#)?;
        assert_eq!(request.email, "a@x.com");
        assert!(request.device_name.is_none());
        assert!(request.device_id.is_none());
        Ok(())
    }

    #[test]
    fn auth_response_hides_session_id() -> Result<()> {
        let tokens = AuthTokens {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now(),
            has_onboarded: true,
        };
        let session_id = tokens.session_id.to_string();
        let value = serde_json::to_value(AuthResponse::from(tokens))?;

        let object = value.as_object().context("expected object")?;
        assert_eq!(object.len(), 5);
        assert_eq!(
            value.get("has_onboarded").and_then(serde_json::Value::as_bool),
            Some(true)
        );
        assert!(!value.to_string().contains(&session_id));
        Ok(())
    }
}
