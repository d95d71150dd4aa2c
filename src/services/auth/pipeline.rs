//! Identification / authentication roles and their explicit registration.
//!
//! A plugin implements one or both roles; the application registers it by name.
//! Nothing is discovered dynamically.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::services::auth::cookies::HeaderPair;
use crate::services::auth::identity::Identity;
use crate::services::auth::request::CredentialRequest;
use crate::services::auth::userid_codec::UserId;

/// Extracts credentials from requests and persists / clears them on responses.
pub trait IdentityExtractor: Send + Sync {
    fn identify(&self, request: &mut CredentialRequest) -> Option<Identity>;

    /// `None` when the client already holds an up-to-date credential.
    fn remember(&self, request: &CredentialRequest, identity: &Identity)
    -> Option<Vec<HeaderPair>>;

    fn forget(&self, request: &CredentialRequest, identity: &Identity) -> Vec<HeaderPair>;
}

/// Turns an extracted identity into a confirmed userid.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, request: &CredentialRequest, identity: &mut Identity)
    -> Option<UserId>;
}

#[derive(Clone, Default)]
pub struct AuthPipeline {
    identifiers: Vec<(&'static str, Arc<dyn IdentityExtractor>)>,
    authenticators: Vec<(&'static str, Arc<dyn Authenticator>)>,
}

impl fmt::Debug for AuthPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identifiers: Vec<_> = self.identifiers.iter().map(|(name, _)| *name).collect();
        let authenticators: Vec<_> = self.authenticators.iter().map(|(name, _)| *name).collect();
        f.debug_struct("AuthPipeline")
            .field("identifiers", &identifiers)
            .field("authenticators", &authenticators)
            .finish()
    }
}

impl AuthPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_identifier(
        mut self,
        name: &'static str,
        identifier: Arc<dyn IdentityExtractor>,
    ) -> Self {
        self.identifiers.push((name, identifier));
        self
    }

    pub fn register_authenticator(
        mut self,
        name: &'static str,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        self.authenticators.push((name, authenticator));
        self
    }

    /// First identity found by the identifiers that some authenticator accepts.
    pub fn identify(&self, request: &mut CredentialRequest) -> Option<(Identity, UserId)> {
        for (identifier_name, identifier) in &self.identifiers {
            let Some(mut identity) = identifier.identify(request) else {
                continue;
            };

            if let Some(userid) = self.authenticate(request, &mut identity) {
                debug!(identifier = identifier_name, userid = %userid, "request identified");
                return Some((identity, userid));
            }
        }
        None
    }

    pub fn authenticate(
        &self,
        request: &CredentialRequest,
        identity: &mut Identity,
    ) -> Option<UserId> {
        self.authenticators
            .iter()
            .find_map(|(name, authenticator)| {
                let userid = authenticator.authenticate(request, identity)?;
                debug!(authenticator = name, userid = %userid, "identity accepted");
                Some(userid)
            })
    }

    /// Headers from every identifier; `None` when none of them has anything to write.
    pub fn remember(
        &self,
        request: &CredentialRequest,
        identity: &Identity,
    ) -> Option<Vec<HeaderPair>> {
        let headers: Vec<HeaderPair> = self
            .identifiers
            .iter()
            .filter_map(|(_, identifier)| identifier.remember(request, identity))
            .flatten()
            .collect();

        (!headers.is_empty()).then_some(headers)
    }

    pub fn forget(&self, request: &CredentialRequest, identity: &Identity) -> Vec<HeaderPair> {
        self.identifiers
            .iter()
            .flat_map(|(_, identifier)| identifier.forget(request, identity))
            .collect()
    }
}
