pub mod auth_tkt;
pub mod clock;
pub mod cookies;
pub mod factory;
pub mod identity;
pub mod pipeline;
pub mod request;
pub mod ticket;
pub mod userid_codec;

pub use auth_tkt::{AuthTktConfigError, AuthTktOptions, AuthTktPlugin};
pub use factory::build_auth_pipeline;
pub use identity::Identity;
pub use pipeline::{AuthPipeline, Authenticator, IdentityExtractor};
pub use request::{AuthAnnotations, CredentialRequest};
pub use userid_codec::UserId;
