//! Register, login, refresh and logout endpoints.

use axum::{
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::{net::SocketAddr, sync::Arc};

use super::{
    error::error_response,
    state::AuthState,
    types::{
        AuthResponse, ErrorResponse, LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest,
        RegisterRequest,
    },
    utils::{
        extract_user_agent, resolve_client_ip, valid_email, valid_optional_length,
        valid_password_length, DEVICE_FIELD_MAX_CHARS, EMAIL_MAX_CHARS, NAME_MAX_CHARS,
        REGISTER_PASSWORD_MIN_CHARS,
    },
};
use crate::auth::{DeviceInfo, RateLimitAction, RateLimitDecision};

fn client_ip(
    auth_state: &AuthState,
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    resolve_client_ip(
        headers,
        connect_info.map(|ConnectInfo(addr)| addr.ip()),
        auth_state.trust_proxy_headers(),
    )
}

fn missing_payload() -> axum::response::Response {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, "Missing payload")
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created and signed in", body = AuthResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let email = request.email.trim();
    if !valid_email(email) || email.chars().count() > EMAIL_MAX_CHARS {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid email");
    }
    if !valid_password_length(&request.password, REGISTER_PASSWORD_MIN_CHARS) {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password must be between 8 and 72 characters",
        );
    }
    if !valid_optional_length(request.first_name.as_deref(), NAME_MAX_CHARS)
        || !valid_optional_length(request.last_name.as_deref(), NAME_MAX_CHARS)
    {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Names must be at most 100 characters",
        );
    }

    let ip = client_ip(&auth_state, &headers, connect_info.as_ref());
    if auth_state
        .rate_limiter()
        .check_ip(ip.as_deref(), RateLimitAction::Register)
        == RateLimitDecision::Limited
    {
        return error_response(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
    }

    match auth_state
        .service()
        .register(email, &request.password, request.first_name, request.last_name)
        .await
    {
        Ok(tokens) => (StatusCode::OK, Json(AuthResponse::from(tokens))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    let email = request.email.trim();
    if !valid_email(email) {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid email");
    }
    if !valid_password_length(&request.password, 1) {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password must be between 1 and 72 characters",
        );
    }
    if !valid_optional_length(request.device_name.as_deref(), DEVICE_FIELD_MAX_CHARS)
        || !valid_optional_length(request.device_id.as_deref(), DEVICE_FIELD_MAX_CHARS)
    {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Device fields must be at most 120 characters",
        );
    }

    let ip = client_ip(&auth_state, &headers, connect_info.as_ref());
    if auth_state
        .rate_limiter()
        .check_ip(ip.as_deref(), RateLimitAction::Login)
        == RateLimitDecision::Limited
    {
        return error_response(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
    }

    let device = DeviceInfo {
        device_name: request.device_name,
        device_id: request.device_id,
        ip_address: ip,
        user_agent: extract_user_agent(&headers),
    };

    match auth_state
        .service()
        .login(email, &request.password, device)
        .await
    {
        Ok(tokens) => (StatusCode::OK, Json(AuthResponse::from(tokens))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refresh token rotated", body = AuthResponse),
        (status = 401, description = "Refresh token invalid, used or revoked", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    match auth_state.service().refresh(&request.refresh_token).await {
        Ok(tokens) => (StatusCode::OK, Json(AuthResponse::from(tokens))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Session revoked", body = LogoutResponse),
        (status = 401, description = "Refresh token cannot be decoded", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LogoutRequest>>,
) -> impl IntoResponse {
    let request: LogoutRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    match auth_state.service().logout(&request.refresh_token).await {
        Ok(()) => (StatusCode::OK, Json(LogoutResponse { success: true })).into_response(),
        Err(err) => err.into_response(),
    }
}
