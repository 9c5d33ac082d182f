//! Access/refresh token lifecycle.

pub mod config;
pub mod error;
pub mod model;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use model::{AuthTokens, DeviceInfo, User};
pub use rate_limit::{
    IpRateLimiter, NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter,
};
pub use service::AuthService;
pub use token::{TokenCodec, TokenType};
