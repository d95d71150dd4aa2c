/*
 * Responsibility
 * - HTTP request (headers / extensions) から CredentialRequest を組み立てる
 * - cookie は percent-decode せずに読む (ticket の userid は encode 済みの bytes で署名されている)
 * - middleware と handler (login/logout) の両方から使う
 */
use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{Extensions, HeaderMap, header, request::Parts};
use axum_extra::extract::cookie::Cookie;

use crate::services::auth::CredentialRequest;
use crate::state::AppState;

/// Build the plugin's view of a request.
///
/// - cookies: every cookie of the `Cookie` header (last one wins on duplicate names)
/// - host: `Host` header, falling back to `server_name`
/// - remote address: `ConnectInfo<SocketAddr>` when the server was started with it
pub fn credential_request(
    headers: &HeaderMap,
    extensions: &Extensions,
    server_name: &str,
) -> CredentialRequest {
    // CookieJar::from_headers は parse_encoded で value を decode してしまうので使わない
    let mut credential = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .fold(CredentialRequest::new(server_name), |req, cookie| {
            req.with_cookie(cookie.name(), cookie.value())
        });

    if let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        credential = credential.with_host(host);
    }

    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        credential = credential.with_remote_addr(addr.ip());
    }

    credential
}

/// Handler 用 extractor (失敗しない)
pub struct Credential(pub CredentialRequest);

impl FromRequestParts<AppState> for Credential {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Credential(credential_request(
            &parts.headers,
            &parts.extensions,
            &state.server_name,
        )))
    }
}
