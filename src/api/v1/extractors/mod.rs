pub mod auth_ctx;
pub mod credential;

pub use auth_ctx::{AuthCtx, AuthCtxExtractor};
pub use credential::{Credential, credential_request};
