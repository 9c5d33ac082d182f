#![allow(clippy::needless_for_each)]

use crate::{
    auth::{AuthConfig, AuthService, RateLimiter},
    store::{
        memory::MemoryTokenIndex,
        postgres::{PgSessionStore, PgUserDirectory},
        redis::RedisTokenIndex,
        TokenIndex,
    },
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

pub mod handlers;

use handlers::{
    types::{
        AuthResponse, ErrorResponse, LoginRequest, LogoutRequest, LogoutResponse,
        OnboardingResponse, RefreshRequest, RegisterRequest, UserProfile,
    },
    AuthState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::users::get_me,
        handlers::users::complete_onboarding
    ),
    components(schemas(
        handlers::health::Health,
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        LogoutRequest,
        AuthResponse,
        LogoutResponse,
        OnboardingResponse,
        UserProfile,
        ErrorResponse
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and token rotation"),
        (name = "users", description = "Authenticated user endpoints"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return Ok(cors.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

/// Build the application router.
///
/// # Errors
/// Returns an error if a CORS origin is not a valid header value.
pub fn router(state: Arc<AuthState>, cors_origins: &[String]) -> Result<Router> {
    let cors = cors_layer(cors_origins)?;

    let app = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
        .route("/users/me", get(handlers::get_me))
        .route("/onboarding/complete", post(handlers::complete_onboarding))
        .route("/health", get(handlers::health).options(handlers::health))
        .route("/api-docs/openapi.json", get(|| async { Json(openapi()) }))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        );

    Ok(app)
}

async fn token_index(redis_url: Option<&str>) -> Result<Arc<dyn TokenIndex>> {
    if let Some(url) = redis_url {
        let index = RedisTokenIndex::connect(url).await?;
        return Ok(Arc::new(index));
    }

    warn!("No Redis URL configured, refresh tokens are indexed in process memory");
    Ok(Arc::new(MemoryTokenIndex::new()))
}

pub struct ServerConfig {
    pub port: u16,
    pub dsn: String,
    pub redis_url: Option<String>,
    pub auth_config: AuthConfig,
    pub cors_origins: Vec<String>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub trust_proxy_headers: bool,
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(config: ServerConfig) -> Result<()> {
    let ServerConfig {
        port,
        dsn,
        redis_url,
        auth_config,
        cors_origins,
        rate_limiter,
        trust_proxy_headers,
    } = config;

    auth_config.validate()?;

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let index = token_index(redis_url.as_deref()).await?;

    let service = AuthService::new(
        &auth_config,
        Arc::new(PgUserDirectory::new(pool.clone())),
        Arc::new(PgSessionStore::new(pool.clone())),
        index,
    );

    let state = Arc::new(
        AuthState::new(service, rate_limiter).with_trust_proxy_headers(trust_proxy_headers),
    );
    let app = router(state, &cors_origins)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;

    info!("Gracefully shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_every_route() {
        let doc = openapi();
        for path in [
            "/health",
            "/auth/register",
            "/auth/login",
            "/auth/refresh",
            "/auth/logout",
            "/users/me",
            "/onboarding/complete",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc
            .components
            .as_ref()
            .map(|components| components.security_schemes.contains_key("bearer"));
        assert_eq!(schemes, Some(true));
    }

    #[test]
    fn cors_rejects_invalid_origin() {
        assert!(cors_layer(&["http://localhost:5173".to_string()]).is_ok());
        assert!(cors_layer(&["*".to_string()]).is_ok());
        assert!(cors_layer(&[]).is_ok());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
    }
}
