/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - auth (cookie 認証), cors, http (request id / trace / limit), security_headers
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
