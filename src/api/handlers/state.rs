use std::sync::Arc;

use crate::auth::{AuthService, RateLimiter};

/// Shared handler state, injected as an `Extension`.
#[derive(Clone)]
pub struct AuthState {
    service: AuthService,
    rate_limiter: Arc<dyn RateLimiter>,
    trust_proxy_headers: bool,
}

impl AuthState {
    #[must_use]
    pub fn new(service: AuthService, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            service,
            rate_limiter,
            trust_proxy_headers: false,
        }
    }

    /// Resolve client IPs from `X-Forwarded-For` / `X-Real-IP` instead of the
    /// socket address. Only safe behind a proxy that overwrites those headers.
    #[must_use]
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    #[must_use]
    pub fn service(&self) -> &AuthService {
        &self.service
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    #[must_use]
    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("service", &self.service)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish_non_exhaustive()
    }
}
