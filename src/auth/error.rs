//! Failure taxonomy for the auth lifecycle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    Conflict,

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Invalid token")]
    InvalidToken,

    /// Only surfaced by identity lookup; the auth flows fold it into `Unauthorized`.
    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Collapse `NotFound` so callers of the token flows cannot probe for user existence.
    #[must_use]
    pub fn hide_not_found(self) -> Self {
        match self {
            Self::NotFound => Self::Unauthorized,
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
