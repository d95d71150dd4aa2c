use crate::services::auth::userid_codec::UserId;

/// Per-request identity passed between the extractor, the authenticator and the persister.
///
/// - `ticket_userid` is what the extractor recovered from the cookie (or, on login, the
///   candidate the application wants to persist)
/// - `userid` is only set once an authenticator has accepted the candidate
/// - `userdata` stays in its raw encoded form, type tag included
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub timestamp: Option<i64>,
    pub ticket_userid: Option<UserId>,
    pub userid: Option<UserId>,
    pub tokens: Vec<String>,
    pub userdata: String,
    pub max_age: Option<u64>,
}

impl Identity {
    /// Candidate identity for `userid`, not yet authenticated.
    pub fn candidate(userid: impl Into<UserId>) -> Self {
        Self {
            ticket_userid: Some(userid.into()),
            ..Self::default()
        }
    }

    /// Identity whose userid is already confirmed (what `remember` expects).
    pub fn confirmed(userid: impl Into<UserId>) -> Self {
        Self {
            userid: Some(userid.into()),
            ..Self::default()
        }
    }

    pub fn with_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_userdata(mut self, userdata: impl Into<String>) -> Self {
        self.userdata = userdata.into();
        self
    }

    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = Some(max_age);
        self
    }
}
