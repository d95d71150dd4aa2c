/*!
 * auth ticket cookie で識別されたユーザーの context
 *
 * Responsibility:
 * - middleware::auth::access が検証した cookie (identity / 確定 userid / annotations) を handler に渡す
 * - AuthCtx は types、axum の extractor 実装は core
 *
 * Public API:
 * - AuthCtx (user_id, identity, annotations)
 * - AuthCtxExtractor (extensions に無ければ 401)
 */

mod core;
mod types;

pub use core::AuthCtxExtractor;
pub use types::AuthCtx;
