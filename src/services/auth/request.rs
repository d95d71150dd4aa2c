//! Transport-neutral view of an inbound request, as far as the cookie plugin cares.
//!
//! The HTTP layer builds one of these per request (cookies already parsed), the
//! plugin reads it and writes its side-channel annotations back into it.

use std::collections::HashMap;
use std::net::IpAddr;

/// Auth type marker written by the cookie extractor.
pub const AUTH_TYPE_COOKIE: &str = "cookie";

/// Side-channel data recorded by `identify` for downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthAnnotations {
    pub remote_user_tokens: Vec<String>,
    pub remote_user_data: String,
    pub auth_type: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct CredentialRequest {
    cookies: HashMap<String, String>,
    remote_addr: Option<IpAddr>,
    host: Option<String>,
    server_name: String,
    annotations: Option<AuthAnnotations>,
}

impl CredentialRequest {
    /// `server_name` is the fallback host when the request carries no `Host` header.
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            ..Self::default()
        }
    }

    /// Surrounding double quotes are stripped, so the stored value compares equal to a
    /// freshly minted ticket.
    pub fn with_cookie(mut self, name: impl Into<String>, value: &str) -> Self {
        self.cookies
            .insert(name.into(), value.trim_matches('"').to_string());
        self
    }

    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    /// `Host` header when present, otherwise the configured server name.
    pub fn effective_host(&self) -> &str {
        self.host.as_deref().unwrap_or(&self.server_name)
    }

    pub fn annotate(&mut self, annotations: AuthAnnotations) {
        self.annotations = Some(annotations);
    }

    pub fn annotations(&self) -> Option<&AuthAnnotations> {
        self.annotations.as_ref()
    }
}
