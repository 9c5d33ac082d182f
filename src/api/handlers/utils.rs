//! Small helpers for request validation and client metadata.

use axum::http::{header::USER_AGENT, HeaderMap};
use regex::Regex;
use std::net::IpAddr;

pub const PASSWORD_MAX_CHARS: usize = 72;
pub const REGISTER_PASSWORD_MIN_CHARS: usize = 8;

// Column widths in sql/schema.sql.
pub const EMAIL_MAX_CHARS: usize = 255;
pub const NAME_MAX_CHARS: usize = 100;
pub const DEVICE_FIELD_MAX_CHARS: usize = 120;
pub const USER_AGENT_MAX_CHARS: usize = 512;
pub const IP_MAX_CHARS: usize = 64;

/// Basic email format check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

pub fn valid_password_length(password: &str, min_chars: usize) -> bool {
    (min_chars..=PASSWORD_MAX_CHARS).contains(&password.chars().count())
}

/// Absent values are valid.
pub fn valid_optional_length(value: Option<&str>, max_chars: usize) -> bool {
    value.is_none_or(|value| value.chars().count() <= max_chars)
}

/// Cut `value` to at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Extract a client IP from common proxy headers.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Client IP for rate limiting and session metadata.
///
/// Proxy headers are only read when `trust_proxy_headers` is set, otherwise
/// the socket address is used.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    socket: Option<IpAddr>,
    trust_proxy_headers: bool,
) -> Option<String> {
    let ip = if trust_proxy_headers {
        extract_client_ip(headers).or_else(|| socket.map(|ip| ip.to_string()))
    } else {
        socket.map(|ip| ip.to_string())
    };
    ip.map(|ip| truncate_chars(&ip, IP_MAX_CHARS))
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| truncate_chars(value, USER_AGENT_MAX_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_garbage() {
        assert!(!valid_email(""));
        assert!(!valid_email("no-at-sign"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("a b@example.com"));
    }

    #[test]
    fn password_length_bounds() {
        assert!(!valid_password_length("1234567", REGISTER_PASSWORD_MIN_CHARS));
        assert!(valid_password_length("12345678", REGISTER_PASSWORD_MIN_CHARS));
        assert!(valid_password_length(&"x".repeat(72), REGISTER_PASSWORD_MIN_CHARS));
        assert!(!valid_password_length(&"x".repeat(73), REGISTER_PASSWORD_MIN_CHARS));
        assert!(!valid_password_length("", 1));
        // counted in characters, not bytes
        assert!(valid_password_length(&"é".repeat(72), 1));
    }

    #[test]
    fn extract_client_ip_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("9.9.9.9".to_string()));
    }

    #[test]
    fn extract_client_ip_none_when_missing() {
        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn optional_length_bounds() {
        assert!(valid_optional_length(None, NAME_MAX_CHARS));
        assert!(valid_optional_length(Some(&"a".repeat(100)), NAME_MAX_CHARS));
        assert!(!valid_optional_length(Some(&"a".repeat(101)), NAME_MAX_CHARS));
        assert!(valid_optional_length(Some(&"ü".repeat(120)), DEVICE_FIELD_MAX_CHARS));
    }

    #[test]
    fn truncate_chars_keeps_whole_characters() {
        assert_eq!(truncate_chars("moodsync", 4), "mood");
        assert_eq!(truncate_chars("short", 64), "short");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }

    #[test]
    fn resolve_client_ip_ignores_proxy_headers_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        let socket = Some(IpAddr::from([10, 0, 0, 7]));

        assert_eq!(
            resolve_client_ip(&headers, socket, false),
            Some("10.0.0.7".to_string())
        );
        assert_eq!(resolve_client_ip(&headers, None, false), None);
        assert_eq!(
            resolve_client_ip(&headers, socket, true),
            Some("1.2.3.4".to_string())
        );
        assert_eq!(
            resolve_client_ip(&HeaderMap::new(), socket, true),
            Some("10.0.0.7".to_string())
        );
    }

    #[test]
    fn resolve_client_ip_truncates_forged_values() -> anyhow::Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(&"9".repeat(300))?);
        let ip = resolve_client_ip(&headers, None, true).unwrap_or_default();
        assert_eq!(ip.chars().count(), IP_MAX_CHARS);
        Ok(())
    }

    #[test]
    fn extract_user_agent_is_truncated() -> anyhow::Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&"a".repeat(600))?);
        let agent = extract_user_agent(&headers).unwrap_or_default();
        assert_eq!(agent.len(), USER_AGENT_MAX_CHARS);
        Ok(())
    }

    #[test]
    fn extract_user_agent_reads_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_user_agent(&headers), None);
        headers.insert(USER_AGENT, HeaderValue::from_static("moodsync-ios/1.0"));
        assert_eq!(
            extract_user_agent(&headers),
            Some("moodsync-ios/1.0".to_string())
        );
    }
}
