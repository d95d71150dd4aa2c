/*
 * Responsibility
 * - GET /me (cookie 認証が必要)
 * - middleware が入れた AuthCtx をそのまま返す
 */
use axum::Json;

use crate::api::v1::{dto::session::MeResponse, extractors::AuthCtxExtractor};

pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<MeResponse> {
    Json(MeResponse {
        userid: ctx.user_id,
        tokens: ctx.identity.tokens,
        userdata: ctx.identity.userdata,
        issued_at: ctx.identity.timestamp,
        auth_type: ctx.annotations.auth_type,
    })
}
