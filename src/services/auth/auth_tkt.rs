//! Signed-cookie ("auth ticket") identifier + authenticator.
//!
//! Lifecycle:
//! - `identify`: cookie → verified ticket → timeout check → typed identity
//! - `authenticate`: apply the optional userid checker, confirm the userid
//! - `remember`: reissue only when the payload changed or the reissue window elapsed
//! - `forget`: unconditional invalidation cookies

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::auth::clock::{Clock, system_clock};
use crate::services::auth::cookies::{
    CookieSpec, HeaderPair, INVALID_COOKIE_VALUE, set_cookie_headers,
};
use crate::services::auth::identity::Identity;
use crate::services::auth::pipeline::{Authenticator, IdentityExtractor};
use crate::services::auth::request::{AUTH_TYPE_COOKIE, AuthAnnotations, CredentialRequest};
use crate::services::auth::ticket::Ticket;
use crate::services::auth::userid_codec::{self, UserId};

pub const DEFAULT_COOKIE_NAME: &str = "auth_tkt";

// Binding address used when the ticket is not tied to the client IP.
const UNBOUND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

pub type UseridChecker = Arc<dyn Fn(&UserId) -> bool + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthTktConfigError {
    #[error("secret must not be empty")]
    EmptySecret,
    #[error("invalid cookie name: {0:?}")]
    InvalidCookieName(String),
    #[error("{0} must be a positive duration")]
    NonPositiveDuration(&'static str),
    #[error("when timeout is specified, reissue_time must be set to a lower value")]
    ReissueTimeNotBelowTimeout,
}

/// Construction-time options. Defaults match a plain, unbound, non-expiring ticket.
#[derive(Clone)]
pub struct AuthTktOptions {
    pub secret: String,
    pub cookie_name: String,
    pub secure: bool,
    pub include_ip: bool,
    pub timeout: Option<Duration>,
    pub reissue_time: Option<Duration>,
    pub userid_checker: Option<UseridChecker>,
    pub clock: Clock,
}

impl AuthTktOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure: false,
            include_ip: false,
            timeout: None,
            reissue_time: None,
            userid_checker: None,
            clock: system_clock(),
        }
    }
}

pub struct AuthTktPlugin {
    secret: String,
    cookie_name: String,
    secure: bool,
    include_ip: bool,
    timeout: Option<Duration>,
    reissue_time: Option<Duration>,
    userid_checker: Option<UseridChecker>,
    clock: Clock,
}

impl fmt::Debug for AuthTktPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the secret
        f.debug_struct("AuthTktPlugin")
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .field("include_ip", &self.include_ip)
            .field("timeout", &self.timeout)
            .field("reissue_time", &self.reissue_time)
            .field("userid_checker", &self.userid_checker.is_some())
            .finish()
    }
}

impl AuthTktPlugin {
    pub fn new(options: AuthTktOptions) -> Result<Self, AuthTktConfigError> {
        if options.secret.is_empty() {
            return Err(AuthTktConfigError::EmptySecret);
        }
        if !is_valid_cookie_name(&options.cookie_name) {
            return Err(AuthTktConfigError::InvalidCookieName(options.cookie_name));
        }
        if options.timeout.is_some_and(|d| d <= Duration::zero()) {
            return Err(AuthTktConfigError::NonPositiveDuration("timeout"));
        }
        if options.reissue_time.is_some_and(|d| d <= Duration::zero()) {
            return Err(AuthTktConfigError::NonPositiveDuration("reissue_time"));
        }
        if let Some(timeout) = options.timeout
            && options.reissue_time.is_none_or(|reissue| reissue >= timeout)
        {
            return Err(AuthTktConfigError::ReissueTimeNotBelowTimeout);
        }

        Ok(Self {
            secret: options.secret,
            cookie_name: options.cookie_name,
            secure: options.secure,
            include_ip: options.include_ip,
            timeout: options.timeout,
            reissue_time: options.reissue_time,
            userid_checker: options.userid_checker,
            clock: options.clock,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn binding_addr(&self, request: &CredentialRequest) -> Option<IpAddr> {
        if !self.include_ip {
            return Some(UNBOUND_ADDR);
        }
        let addr = request.remote_addr();
        if addr.is_none() {
            warn!(
                cookie = %self.cookie_name,
                "include_ip is set but the request has no remote address"
            );
        }
        addr
    }

    fn parse_ticket(&self, value: &str, addr: IpAddr) -> Option<Ticket> {
        match Ticket::parse(self.secret.as_bytes(), value, addr) {
            Ok(ticket) => Some(ticket),
            Err(err) => {
                debug!(error = %err, cookie = %self.cookie_name, "ignoring bad auth ticket");
                None
            }
        }
    }

    fn elapsed(timestamp: i64, window: Duration, now: DateTime<Utc>) -> bool {
        timestamp.saturating_add(window.num_seconds()) < now.timestamp()
    }

    fn cookie_headers(
        &self,
        request: &CredentialRequest,
        value: &str,
        max_age: Option<u64>,
    ) -> Vec<HeaderPair> {
        let spec = CookieSpec {
            name: &self.cookie_name,
            value,
            max_age,
            secure: self.secure,
        };
        set_cookie_headers(spec, request.effective_host(), self.now())
    }
}

impl IdentityExtractor for AuthTktPlugin {
    fn identify(&self, request: &mut CredentialRequest) -> Option<Identity> {
        let value = request
            .cookie(&self.cookie_name)
            .filter(|v| !v.is_empty())?
            .to_string();
        let addr = self.binding_addr(request)?;
        let ticket = self.parse_ticket(&value, addr)?;

        if let Some(timeout) = self.timeout
            && Self::elapsed(ticket.timestamp, timeout, self.now())
        {
            debug!(
                cookie = %self.cookie_name,
                timestamp = ticket.timestamp,
                "auth ticket expired"
            );
            return None;
        }

        let userid = userid_codec::decode_userid(&ticket.userid, &ticket.user_data);

        request.annotate(AuthAnnotations {
            remote_user_tokens: ticket.tokens.clone(),
            remote_user_data: ticket.user_data.clone(),
            auth_type: AUTH_TYPE_COOKIE,
        });

        Some(Identity {
            timestamp: Some(ticket.timestamp),
            ticket_userid: Some(userid),
            userid: None,
            tokens: ticket.tokens,
            userdata: ticket.user_data,
            max_age: None,
        })
    }

    fn remember(
        &self,
        request: &CredentialRequest,
        identity: &Identity,
    ) -> Option<Vec<HeaderPair>> {
        let Some(userid) = identity.userid.as_ref() else {
            debug!("remember called without a confirmed userid");
            return None;
        };
        let addr = self.binding_addr(request)?;

        let old_value = request.cookie(&self.cookie_name).filter(|v| !v.is_empty());
        let old_ticket = old_value.and_then(|v| self.parse_ticket(v, addr));

        let (encoded_userid, userdata) = userid_codec::encode_userid(userid, &identity.userdata);

        let unchanged = old_ticket.as_ref().is_some_and(|old| {
            old.userid == encoded_userid && old.tokens == identity.tokens && old.user_data == userdata
        });

        let now = self.now();
        let reissue_due = self.reissue_time.is_some_and(|reissue| {
            old_ticket
                .as_ref()
                .is_none_or(|old| Self::elapsed(old.timestamp, reissue, now))
        });

        if unchanged && !reissue_due {
            return None;
        }

        let ticket = Ticket::new(
            now.timestamp(),
            encoded_userid,
            identity.tokens.clone(),
            userdata,
        );
        let new_value = match ticket.sign(self.secret.as_bytes(), addr) {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, userid = %userid, "cannot mint auth ticket");
                return None;
            }
        };

        if old_value == Some(new_value.as_str()) {
            return None;
        }

        debug!(userid = %userid, reissue_due, "issuing auth ticket");
        Some(self.cookie_headers(request, &new_value, identity.max_age))
    }

    fn forget(&self, request: &CredentialRequest, _identity: &Identity) -> Vec<HeaderPair> {
        self.cookie_headers(request, INVALID_COOKIE_VALUE, Some(0))
    }
}

impl Authenticator for AuthTktPlugin {
    fn authenticate(
        &self,
        _request: &CredentialRequest,
        identity: &mut Identity,
    ) -> Option<UserId> {
        let userid = identity.ticket_userid.clone()?;

        if let Some(checker) = &self.userid_checker
            && !checker(&userid)
        {
            debug!(userid = %userid, "userid rejected by checker");
            return None;
        }

        identity.userid = Some(userid.clone());
        Some(userid)
    }
}

// RFC 6265 cookie-name token.
fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                        | b'{'
                        | b'}'
                )
        })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::services::auth::clock::fixed_clock;

    const SECRET: &str = "correct horse battery staple";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn plugin_at(now: DateTime<Utc>, configure: impl FnOnce(&mut AuthTktOptions)) -> AuthTktPlugin {
        let mut options = AuthTktOptions::new(SECRET);
        options.clock = fixed_clock(now);
        configure(&mut options);
        AuthTktPlugin::new(options).unwrap()
    }

    fn request() -> CredentialRequest {
        CredentialRequest::new("localhost").with_host("www.example.com")
    }

    fn mint(plugin: &AuthTktPlugin, identity: &Identity) -> String {
        let headers = plugin.remember(&request(), identity).expect("cookie issued");
        cookie_value(&headers)
    }

    // value of the first Set-Cookie header (`name="value"; ...`)
    fn cookie_value(headers: &[HeaderPair]) -> String {
        let line = headers[0].1.to_str().unwrap();
        let start = line.find('"').unwrap() + 1;
        let end = start + line[start..].find('"').unwrap();
        line[start..end].to_string()
    }

    fn with_ticket(value: &str) -> CredentialRequest {
        request().with_cookie(DEFAULT_COOKIE_NAME, value)
    }

    #[test]
    fn timeout_requires_lower_reissue_time() {
        let build = |timeout: Option<i64>, reissue: Option<i64>| {
            let mut options = AuthTktOptions::new(SECRET);
            options.timeout = timeout.map(Duration::seconds);
            options.reissue_time = reissue.map(Duration::seconds);
            AuthTktPlugin::new(options).map(|_| ())
        };

        assert_eq!(
            build(Some(600), Some(700)),
            Err(AuthTktConfigError::ReissueTimeNotBelowTimeout)
        );
        assert_eq!(
            build(Some(600), Some(600)),
            Err(AuthTktConfigError::ReissueTimeNotBelowTimeout)
        );
        assert_eq!(
            build(Some(600), None),
            Err(AuthTktConfigError::ReissueTimeNotBelowTimeout)
        );
        assert_eq!(build(Some(600), Some(300)), Ok(()));
        assert_eq!(build(None, Some(300)), Ok(()));
        assert_eq!(build(None, None), Ok(()));
    }

    #[test]
    fn rejects_bad_secret_and_cookie_name() {
        assert_eq!(
            AuthTktPlugin::new(AuthTktOptions::new("")).map(|_| ()),
            Err(AuthTktConfigError::EmptySecret)
        );

        let mut options = AuthTktOptions::new(SECRET);
        options.cookie_name = "auth tkt".into();
        assert_eq!(
            AuthTktPlugin::new(options).map(|_| ()),
            Err(AuthTktConfigError::InvalidCookieName("auth tkt".into()))
        );
    }

    #[test]
    fn remember_then_identify_round_trips() {
        let plugin = plugin_at(t0(), |_| {});
        let identity = Identity::confirmed(42_i64)
            .with_tokens(["admin", "editor"])
            .with_userdata("theme=dark");
        let value = mint(&plugin, &identity);

        let mut req = with_ticket(&value);
        let found = plugin.identify(&mut req).expect("identity");

        assert_eq!(found.timestamp, Some(t0().timestamp()));
        assert_eq!(found.ticket_userid, Some(UserId::Integer(42)));
        assert_eq!(found.userid, None);
        assert_eq!(found.tokens, vec!["admin", "editor"]);
        assert_eq!(found.userdata, "userid_type:int|theme=dark");

        let annotations = req.annotations().expect("annotations");
        assert_eq!(annotations.remote_user_tokens, vec!["admin", "editor"]);
        assert_eq!(annotations.remote_user_data, "userid_type:int|theme=dark");
        assert_eq!(annotations.auth_type, "cookie");
    }

    #[test]
    fn text_userid_round_trips() {
        let plugin = plugin_at(t0(), |_| {});
        let value = mint(&plugin, &Identity::confirmed("alice@example.com"));

        let found = plugin.identify(&mut with_ticket(&value)).unwrap();
        assert_eq!(found.ticket_userid, Some(UserId::from("alice@example.com")));
        assert_eq!(found.tokens, Vec::<String>::new());
    }

    #[test]
    fn missing_or_empty_cookie_is_no_identity() {
        let plugin = plugin_at(t0(), |_| {});

        assert_eq!(plugin.identify(&mut request()), None);
        assert_eq!(plugin.identify(&mut with_ticket("")), None);
        assert_eq!(plugin.identify(&mut with_ticket("INVALID")), None);
    }

    #[test]
    fn tampered_ticket_is_no_identity() {
        let plugin = plugin_at(t0(), |_| {});
        let value = mint(&plugin, &Identity::confirmed("bob"));

        let mut tampered = value.clone().into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'x' { b'y' } else { b'x' };
        let tampered = String::from_utf8(tampered).unwrap();

        let mut req = with_ticket(&tampered);
        assert_eq!(plugin.identify(&mut req), None);
        assert_eq!(req.annotations(), None);
    }

    #[test]
    fn ticket_expires_after_timeout() {
        let timeout = 600;
        let configure = |o: &mut AuthTktOptions| {
            o.timeout = Some(Duration::seconds(timeout));
            o.reissue_time = Some(Duration::seconds(300));
        };
        let issuer = plugin_at(t0(), configure);
        let value = mint(&issuer, &Identity::confirmed("carol"));

        let almost = plugin_at(t0() + Duration::seconds(timeout - 1), configure);
        assert!(almost.identify(&mut with_ticket(&value)).is_some());

        let expired = plugin_at(t0() + Duration::seconds(timeout + 1), configure);
        assert_eq!(expired.identify(&mut with_ticket(&value)), None);
    }

    #[test]
    fn include_ip_binds_ticket_to_remote_addr() {
        let plugin = plugin_at(t0(), |o| o.include_ip = true);
        let client: IpAddr = "10.1.2.3".parse().unwrap();

        let headers = plugin
            .remember(&request().with_remote_addr(client), &Identity::confirmed("dave"))
            .unwrap();
        let value = cookie_value(&headers);

        let mut same = with_ticket(&value).with_remote_addr(client);
        assert!(plugin.identify(&mut same).is_some());

        let mut other = with_ticket(&value).with_remote_addr("10.1.2.4".parse().unwrap());
        assert_eq!(plugin.identify(&mut other), None);

        let mut unknown = with_ticket(&value);
        assert_eq!(plugin.identify(&mut unknown), None);
    }

    #[test]
    fn ip_binding_disabled_ignores_remote_addr() {
        let plugin = plugin_at(t0(), |_| {});
        let value = mint(&plugin, &Identity::confirmed("erin"));

        let mut req = with_ticket(&value).with_remote_addr("203.0.113.9".parse().unwrap());
        assert!(plugin.identify(&mut req).is_some());
    }

    #[test]
    fn remember_is_idempotent_for_unchanged_identity() {
        let plugin = plugin_at(t0(), |o| o.reissue_time = Some(Duration::seconds(300)));
        let identity = Identity::confirmed(7_i64).with_tokens(["a"]);

        let first = plugin.remember(&request(), &identity).expect("first issue");
        assert_eq!(first.len(), 3);

        let value = cookie_value(&first);
        assert_eq!(plugin.remember(&with_ticket(&value), &identity), None);
    }

    #[test]
    fn changed_identity_is_reissued() {
        let plugin = plugin_at(t0(), |_| {});
        let value = mint(&plugin, &Identity::confirmed(7_i64));

        let changed = Identity::confirmed(7_i64).with_tokens(["admin"]);
        let headers = plugin.remember(&with_ticket(&value), &changed).expect("reissue");
        let reissued = cookie_value(&headers);

        let found = plugin.identify(&mut with_ticket(&reissued)).unwrap();
        assert_eq!(found.tokens, vec!["admin"]);
    }

    #[test]
    fn stale_ticket_is_reissued_with_new_timestamp() {
        let configure = |o: &mut AuthTktOptions| o.reissue_time = Some(Duration::seconds(300));
        let identity = Identity::confirmed("frank");
        let value = mint(&plugin_at(t0(), configure), &identity);

        let fresh = plugin_at(t0() + Duration::seconds(299), configure);
        assert_eq!(fresh.remember(&with_ticket(&value), &identity), None);

        let later = t0() + Duration::seconds(301);
        let stale = plugin_at(later, configure);
        let headers = stale
            .remember(&with_ticket(&value), &identity)
            .expect("reissue after window");
        let reissued = cookie_value(&headers);

        let found = stale.identify(&mut with_ticket(&reissued)).unwrap();
        assert_eq!(found.timestamp, Some(later.timestamp()));
        assert_eq!(found.ticket_userid, Some(UserId::from("frank")));
    }

    #[test]
    fn remember_without_confirmed_userid_is_noop() {
        let plugin = plugin_at(t0(), |_| {});
        assert_eq!(plugin.remember(&request(), &Identity::candidate(1_i64)), None);
    }

    #[test]
    fn remember_passes_max_age_and_secure() {
        let plugin = plugin_at(t0(), |o| o.secure = true);
        let headers = plugin
            .remember(&request(), &Identity::confirmed(1_i64).with_max_age(60))
            .unwrap();

        for (_, value) in &headers {
            let line = value.to_str().unwrap();
            assert!(line.contains("; Max-Age=60; Expires=Sat, 01 Jun 2024 09:01:00 GMT"));
            assert!(line.ends_with("; secure; HttpOnly"));
        }
    }

    #[test]
    fn forget_always_emits_three_invalidations() {
        let plugin = plugin_at(t0(), |_| {});
        let value = mint(&plugin, &Identity::confirmed(1_i64));

        for req in [request(), with_ticket(&value), with_ticket("garbage")] {
            let headers = plugin.forget(&req, &Identity::default());
            let lines: Vec<_> = headers.iter().map(|(_, v)| v.to_str().unwrap()).collect();

            assert_eq!(lines.len(), 3);
            assert!(lines.iter().all(|l| l.starts_with("auth_tkt=\"INVALID\"; Path=/")));
            assert!(lines.iter().all(|l| l.contains("; Max-Age=0; ")));
            assert!(!lines[0].contains("Domain="));
            assert!(lines[1].contains("; Domain=www.example.com;"));
            assert!(lines[2].contains("; Domain=.example.com;"));
        }
    }

    #[test]
    fn authenticate_applies_checker() {
        let plugin = plugin_at(t0(), |o| {
            o.userid_checker = Some(Arc::new(|userid: &UserId| userid != &UserId::from("mallory")));
        });

        let mut ok = Identity::candidate("alice");
        assert_eq!(
            plugin.authenticate(&request(), &mut ok),
            Some(UserId::from("alice"))
        );
        assert_eq!(ok.userid, Some(UserId::from("alice")));

        let mut rejected = Identity::candidate("mallory");
        assert_eq!(plugin.authenticate(&request(), &mut rejected), None);
        assert_eq!(rejected.userid, None);
        assert_eq!(rejected.ticket_userid, Some(UserId::from("mallory")));

        let mut empty = Identity::default();
        assert_eq!(plugin.authenticate(&request(), &mut empty), None);
    }
}
