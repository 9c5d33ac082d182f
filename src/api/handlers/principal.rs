//! Authenticated principal extraction.
//!
//! Flow Overview: read the bearer token, verify it as an access token, and
//! load the user it names.

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::state::AuthState;
use crate::auth::{error::Result, AuthError, User};

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the bearer token into the current user.
///
/// # Errors
/// `InvalidToken` when the header is missing or the token does not verify,
/// `NotFound` when the user behind a valid token no longer exists.
pub async fn require_auth(headers: &HeaderMap, state: &AuthState) -> Result<User> {
    let token = bearer_token(headers).ok_or(AuthError::InvalidToken)?;
    state.service().current_user(token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
