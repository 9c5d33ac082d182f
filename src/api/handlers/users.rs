//! Endpoints for the signed-in user.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::{
    principal::require_auth,
    state::AuthState,
    types::{ErrorResponse, OnboardingResponse, UserProfile},
};

#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Return the authenticated user profile", body = UserProfile),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_me(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    match require_auth(&headers, &auth_state).await {
        Ok(user) => (StatusCode::OK, Json(UserProfile::from(user))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/onboarding/complete",
    responses(
        (status = 200, description = "Onboarding marked complete", body = OnboardingResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn complete_onboarding(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let user = match require_auth(&headers, &auth_state).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match auth_state.service().complete_onboarding(user.user_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(OnboardingResponse {
                success: true,
                has_onboarded: true,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
