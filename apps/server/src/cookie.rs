//! Minimal cookie plumbing for the session and flash cookies.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

/// Signed session token.
pub const SESSION_COOKIE: &str = "stockroom_session";

/// One-shot notices carried across a redirect.
pub const FLASH_COOKIE: &str = "stockroom_flash";

/// Finds cookie `name` in the request's `Cookie` headers.
pub fn read<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// `Set-Cookie` value for an HttpOnly, site-wide cookie.
///
/// `max_age` of `None` makes it a browser-session cookie.
pub fn set(name: &str, value: &str, max_age: Option<i64>, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(secs) = max_age {
        cookie.push_str(&format!("; Max-Age={secs}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires cookie `name` immediately.
pub fn clear(name: &str, secure: bool) -> String {
    set(name, "", Some(0), secure)
}
