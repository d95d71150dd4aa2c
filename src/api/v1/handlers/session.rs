/*
 * Responsibility
 * - POST /session: candidate identity を authenticator に通し、remember の Set-Cookie を返す
 * - DELETE /session: forget (無条件に INVALID cookie を 3 本返す)
 * - パスワード等の本人確認はこの handler の責務ではない (前段の login flow が担う)
 */
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::{
    api::v1::{dto::session::CreateSessionRequest, extractors::Credential},
    error::AppError,
    services::auth::{Identity, cookies::HeaderPair},
    state::AppState,
};

pub async fn create_session(
    State(state): State<AppState>,
    Credential(credential): Credential,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, HeaderMap), AppError> {
    req.validate()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))?;

    let mut identity = req.into_identity();
    let Some(userid) = state.auth.authenticate(&credential, &mut identity) else {
        tracing::info!("login rejected by userid checker");
        return Err(AppError::Forbidden);
    };

    let headers = state.auth.remember(&credential, &identity).unwrap_or_default();
    tracing::info!(userid = %userid, cookies = headers.len(), "session established");

    Ok((StatusCode::NO_CONTENT, into_header_map(headers)))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Credential(credential): Credential,
) -> (StatusCode, HeaderMap) {
    let headers = state.auth.forget(&credential, &Identity::default());

    (StatusCode::NO_CONTENT, into_header_map(headers))
}

fn into_header_map(headers: Vec<HeaderPair>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        // Set-Cookie は複数行になるので insert ではなく append
        map.append(name, value);
    }
    map
}
