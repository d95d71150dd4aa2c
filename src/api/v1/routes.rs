/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health, /session は公開、/me は cookie 認証 (middleware::auth::access) の内側
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    health::health,
    me::me,
    session::{create_session, delete_session},
};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new().route("/me", get(me));
    let protected = middleware::auth::access::apply(protected, state);

    Router::new()
        .route("/health", get(health))
        .route("/session", post(create_session).delete(delete_session))
        .merge(protected)
}
