//! Signed auth ticket (mod_auth_tkt style layout with a SHA-256 digest).
//!
//! Wire layout:
//! `digest(64 hex) || timestamp(8 hex) || urlencode(userid) || "!" || [tokens "!"] || user_data`
//!
//! The digest is bound to the client address, so a ticket minted for one address
//! does not verify for another. Callers that do not want address binding pass
//! `0.0.0.0` on both sides.

use std::net::IpAddr;

use sha2::{Digest, Sha256};
use thiserror::Error;

const DIGEST_HEX_LEN: usize = 64;
const TIMESTAMP_HEX_LEN: usize = 8;
const HEADER_LEN: usize = DIGEST_HEX_LEN + TIMESTAMP_HEX_LEN;

/// Reasons a serialized ticket is rejected.
///
/// Every variant means the same thing to the caller ("no credential"); the split is
/// only useful for debug logs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BadTicket {
    #[error("ticket is too short")]
    TooShort,
    #[error("invalid digest encoding")]
    InvalidDigest,
    #[error("invalid timestamp encoding")]
    InvalidTimestamp,
    #[error("userid is not followed by '!'")]
    MissingSeparator,
    #[error("userid is not canonically encoded")]
    InvalidUserid,
    #[error("digest mismatch")]
    DigestMismatch,
}

/// Errors raised while minting a ticket (fields that could not survive a round trip).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("token {0:?} is empty or contains a reserved character")]
    InvalidToken(String),
    #[error("user data contains a reserved character")]
    InvalidUserData,
    #[error("timestamp {0} does not fit the ticket format")]
    TimestampOutOfRange(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub timestamp: i64,
    pub userid: String,
    pub tokens: Vec<String>,
    pub user_data: String,
}

impl Ticket {
    pub fn new(
        timestamp: i64,
        userid: impl Into<String>,
        tokens: Vec<String>,
        user_data: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            userid: userid.into(),
            tokens,
            user_data: user_data.into(),
        }
    }

    /// Serialize and sign the ticket for `client_addr`.
    pub fn sign(&self, secret: &[u8], client_addr: IpAddr) -> Result<String, TicketError> {
        let timestamp = u32::try_from(self.timestamp)
            .map_err(|_| TicketError::TimestampOutOfRange(self.timestamp))?;
        validate_fields(&self.tokens, &self.user_data)?;

        let tokens = self.tokens.join(",");
        let digest = calculate_digest(
            secret,
            client_addr,
            timestamp,
            &self.userid,
            &tokens,
            &self.user_data,
        );

        let mut value = format!(
            "{digest}{timestamp:08x}{}!",
            urlencoding::encode(&self.userid)
        );
        if !tokens.is_empty() {
            value.push_str(&tokens);
            value.push('!');
        }
        value.push_str(&self.user_data);

        Ok(value)
    }

    /// Verify `value` against `secret` / `client_addr` and split it into its fields.
    pub fn parse(secret: &[u8], value: &str, client_addr: IpAddr) -> Result<Self, BadTicket> {
        let value = value.trim_matches('"');

        let digest = value.get(..DIGEST_HEX_LEN).ok_or(BadTicket::TooShort)?;
        if !is_lower_hex(digest) {
            return Err(BadTicket::InvalidDigest);
        }

        // lowercase only: `A` and `a` would otherwise decode to the same timestamp
        let timestamp_hex = value
            .get(DIGEST_HEX_LEN..HEADER_LEN)
            .ok_or(BadTicket::TooShort)?;
        if !is_lower_hex(timestamp_hex) {
            return Err(BadTicket::InvalidTimestamp);
        }
        let timestamp =
            u32::from_str_radix(timestamp_hex, 16).map_err(|_| BadTicket::InvalidTimestamp)?;

        let rest = value.get(HEADER_LEN..).ok_or(BadTicket::TooShort)?;
        let (quoted_userid, data) = rest.split_once('!').ok_or(BadTicket::MissingSeparator)?;

        let userid = urlencoding::decode(quoted_userid).map_err(|_| BadTicket::InvalidUserid)?;
        if urlencoding::encode(&userid) != quoted_userid {
            return Err(BadTicket::InvalidUserid);
        }

        let (tokens, user_data) = data.split_once('!').unwrap_or(("", data));

        let expected = calculate_digest(secret, client_addr, timestamp, &userid, tokens, user_data);
        if !constant_time_eq(expected.as_bytes(), digest.as_bytes()) {
            return Err(BadTicket::DigestMismatch);
        }

        let tokens = if tokens.is_empty() {
            Vec::new()
        } else {
            tokens.split(',').map(str::to_string).collect()
        };

        Ok(Self {
            timestamp: i64::from(timestamp),
            userid: userid.into_owned(),
            tokens,
            user_data: user_data.to_string(),
        })
    }
}

/// Check that tokens / user data can be carried by a ticket and parsed back unchanged.
pub fn validate_fields(tokens: &[String], user_data: &str) -> Result<(), TicketError> {
    if let Some(bad) = tokens
        .iter()
        .find(|t| t.is_empty() || !t.chars().all(|c| is_cookie_safe(c) && c != ','))
    {
        return Err(TicketError::InvalidToken(bad.clone()));
    }
    if !user_data.chars().all(is_cookie_safe) {
        return Err(TicketError::InvalidUserData);
    }
    Ok(())
}

// Printable ASCII, minus the field separator and what would break a quoted cookie value.
fn is_cookie_safe(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '!' | '"' | ';' | '\\')
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn calculate_digest(
    secret: &[u8],
    client_addr: IpAddr,
    timestamp: u32,
    userid: &str,
    tokens: &str,
    user_data: &str,
) -> String {
    let mut hasher = Sha256::new();
    match client_addr {
        IpAddr::V4(v4) => hasher.update(v4.octets()),
        IpAddr::V6(v6) => hasher.update(v6.octets()),
    }
    hasher.update(timestamp.to_be_bytes());
    hasher.update(secret);
    hasher.update(userid.as_bytes());
    hasher.update([0u8]);
    hasher.update(tokens.as_bytes());
    hasher.update([0u8]);
    hasher.update(user_data.as_bytes());
    let inner = hex::encode(hasher.finalize());

    let mut hasher = Sha256::new();
    hasher.update(inner.as_bytes());
    hasher.update(secret);
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
