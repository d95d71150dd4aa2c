/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: 登録済みの AuthPipeline, server_name: Host ヘッダが無い時の cookie Domain
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::AuthPipeline;

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: Arc<AuthPipeline>,
    pub server_name: Arc<str>,
}

impl AppState {
    pub fn new(auth: Arc<AuthPipeline>, server_name: impl Into<Arc<str>>) -> Self {
        Self {
            auth,
            server_name: server_name.into(),
        }
    }
}
