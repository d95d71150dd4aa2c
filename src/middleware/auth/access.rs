//! auth ticket cookie 検証 → AuthCtx を extensions に入れる
//!
//! - request: pipeline.identify (cookie → identity → authenticate)
//! - response: pipeline.remember で ticket を必要なら再発行 (reissue_time 経過 / 内容変更)
//!
//! cookie が無い・壊れている・期限切れ・checker で拒否、はすべて 401 (区別しない)

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::{AuthCtx, credential_request};
use crate::error::AppError;
use crate::state::AppState;

/// 保護したい Router に cookie 認証を掛ける。
///
/// 例：
/// ```ignore
/// let protected = Router::new().route("/me", get(me));
/// let protected = middleware::auth::access::apply(protected, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let mut credential = credential_request(req.headers(), req.extensions(), &state.server_name);

    let Some((identity, user_id)) = state.auth.identify(&mut credential) else {
        tracing::debug!(path = %req.uri().path(), "no valid auth ticket");
        return Err(AppError::Unauthorized);
    };

    let annotations = credential.annotations().cloned().unwrap_or_default();
    let auth_ctx = AuthCtx::new(user_id, identity.clone()).with_annotations(annotations);

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(auth_ctx);

    let mut response = next.run(req).await;

    // active user の ticket を延命する (変化が無く reissue 窓内なら何も出ない)
    if let Some(headers) = state.auth.remember(&credential, &identity) {
        tracing::debug!(count = headers.len(), "reissuing auth ticket");
        for (name, value) in headers {
            response.headers_mut().append(name, value);
        }
    }

    Ok(response)
}
