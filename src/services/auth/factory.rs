/// Factory: build the auth pipeline from application `Config`.
use std::sync::Arc;

use chrono::Duration;

use crate::config::Config;
use crate::services::auth::auth_tkt::{AuthTktConfigError, AuthTktOptions, AuthTktPlugin};
use crate::services::auth::pipeline::AuthPipeline;
use crate::services::auth::userid_codec::UserId;

pub fn build_auth_tkt(config: &Config) -> Result<AuthTktPlugin, AuthTktConfigError> {
    let mut options = AuthTktOptions::new(config.auth_tkt_secret.clone());
    options.cookie_name = config.auth_tkt_cookie_name.clone();
    options.secure = config.auth_tkt_secure;
    options.include_ip = config.auth_tkt_include_ip;
    options.timeout = config.auth_tkt_timeout_seconds.map(Duration::seconds);
    options.reissue_time = config.auth_tkt_reissue_seconds.map(Duration::seconds);

    if !config.auth_tkt_allowed_userids.is_empty() {
        let allowed = config.auth_tkt_allowed_userids.clone();
        options.userid_checker = Some(Arc::new(move |userid: &UserId| {
            let userid = userid.to_string();
            allowed.iter().any(|a| *a == userid)
        }));
    }

    AuthTktPlugin::new(options)
}

/// The cookie plugin is registered in both roles.
pub fn build_auth_pipeline(config: &Config) -> Result<Arc<AuthPipeline>, AuthTktConfigError> {
    let auth_tkt = Arc::new(build_auth_tkt(config)?);

    let pipeline = AuthPipeline::new()
        .register_identifier("auth_tkt", auth_tkt.clone())
        .register_authenticator("auth_tkt", auth_tkt);

    Ok(Arc::new(pipeline))
}
