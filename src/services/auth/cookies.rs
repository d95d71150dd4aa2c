//! `Set-Cookie` emission for the auth ticket.
//!
//! Every write goes out three times with the same name/value so that host-only,
//! explicit-host and parent-domain scoped cookies are all replaced together:
//! - `Path=/` (no Domain)
//! - `Path=/; Domain=<host>`
//! - `Path=/; Domain=<wildcard>`

use axum::http::{HeaderName, HeaderValue, header};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Cookie value written on logout.
pub const INVALID_COOKIE_VALUE: &str = "INVALID";

pub type HeaderPair = (HeaderName, HeaderValue);

/// Attributes shared by the three scoped cookies.
#[derive(Debug, Clone, Copy)]
pub struct CookieSpec<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub max_age: Option<u64>,
    pub secure: bool,
}

/// Build the three `Set-Cookie` headers for `spec`, scoped against `host`.
pub fn set_cookie_headers(spec: CookieSpec<'_>, host: &str, now: DateTime<Utc>) -> Vec<HeaderPair> {
    let max_age = spec
        .max_age
        .map(|secs| max_age_attributes(secs, now))
        .unwrap_or_default();
    let secure = if spec.secure { "; secure; HttpOnly" } else { "" };
    let name = spec.name;
    let value = spec.value;

    let lines = [
        format!("{name}=\"{value}\"; Path=/{max_age}{secure}"),
        format!("{name}=\"{value}\"; Path=/; Domain={host}{max_age}{secure}"),
        format!(
            "{name}=\"{value}\"; Path=/; Domain={}{max_age}{secure}",
            wildcard_domain(host)
        ),
    ];

    lines
        .into_iter()
        .filter_map(|line| match HeaderValue::from_str(&line) {
            Ok(v) => Some((header::SET_COOKIE, v)),
            Err(err) => {
                warn!(error = %err, cookie = name, "dropping unrepresentable Set-Cookie header");
                None
            }
        })
        .collect()
}

/// Parent domain used for the wildcard-scoped cookie: the host from its first `.` on.
///
/// A host without any dot (`localhost`, `intranet:8080`) yields its last character,
/// which no browser will accept as a domain. Kept as is; such hosts still get the
/// host-only and explicit-host cookies.
pub fn wildcard_domain(host: &str) -> &str {
    match host.find('.') {
        Some(idx) => &host[idx..],
        None => host
            .char_indices()
            .next_back()
            .map_or("", |(idx, _)| &host[idx..]),
    }
}

// `Expires` is still required by some clients that ignore `Max-Age`.
fn max_age_attributes(secs: u64, now: DateTime<Utc>) -> String {
    let later = i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    format!(
        "; Max-Age={secs}; Expires={}",
        later.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}
