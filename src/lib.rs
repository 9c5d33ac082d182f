//! # MoodSync (authentication and session service)
//!
//! `moodsync` issues short-lived access tokens and single-use refresh tokens
//! bound to server-side auth sessions.
//!
//! ## Token lifecycle
//!
//! - **Register / login** create a session and return an access token plus a
//!   refresh token whose id is indexed with the session TTL.
//! - **Refresh** consumes the indexed id atomically, revokes the old session and
//!   starts a new one. A refresh token is accepted at most once.
//! - **Logout** revokes the session and drops the index entry. It is idempotent
//!   and accepts expired refresh tokens.
//!
//! Users and sessions live in `PostgreSQL`; the refresh token index lives in
//! Redis, or in process memory when no Redis URL is configured.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
