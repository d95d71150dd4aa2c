/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が cookie を検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - ticket の検証や reissue 判定は services/auth 側の責務
 */

use crate::services::auth::{AuthAnnotations, Identity, UserId};

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `user_id` は authenticator が確定させた userid
/// - `identity` は ticket から復元した内容 (timestamp / tokens / userdata)
/// - `annotations` は identify が残した side-channel 情報
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user_id: UserId,
    pub identity: Identity,
    pub annotations: AuthAnnotations,
}

impl AuthCtx {
    pub fn new(user_id: UserId, identity: Identity) -> Self {
        Self {
            user_id,
            identity,
            annotations: AuthAnnotations::default(),
        }
    }

    pub fn with_annotations(mut self, annotations: AuthAnnotations) -> Self {
        self.annotations = annotations;
        self
    }
}
