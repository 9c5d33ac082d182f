pub mod auth;
pub mod error;
pub mod health;
pub mod principal;
pub mod state;
pub mod types;
pub mod users;
pub mod utils;

pub use self::auth::{login, logout, refresh, register};
pub use self::health::health;
pub use self::state::AuthState;
pub use self::users::{complete_onboarding, get_me};
