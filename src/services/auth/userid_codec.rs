/*
 * Responsibility
 * - 型付き userid <-> ticket に載せる文字列の変換 (encode/decode)
 * - user_data に `userid_type:<tag>` セグメントを埋め込み/読み出し
 * - ticket 自体は文字列しか運べないので、型情報が往復できるのはここだけ
 */
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved user_data segment prefix carrying the userid type tag.
pub const USERID_TYPE_PREFIX: &str = "userid_type:";

const SEGMENT_SEPARATOR: char = '|';

const TAG_INT: &str = "int";
const TAG_UNICODE: &str = "unicode";

/// Application-side user identifier.
///
/// Serialized untagged so JSON numbers map to `Integer` and strings to `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Integer(i64),
    Text(String),
}

impl UserId {
    pub fn tag(&self) -> &'static str {
        match self {
            UserId::Integer(_) => TAG_INT,
            UserId::Text(_) => TAG_UNICODE,
        }
    }

    /// Returns `(tag, encoded)`.
    pub fn encode(&self) -> (&'static str, String) {
        match self {
            UserId::Integer(n) => (TAG_INT, n.to_string()),
            UserId::Text(s) => (TAG_UNICODE, s.clone()),
        }
    }

    /// `None` when the tag is unknown or `raw` does not fit the tagged kind.
    pub fn decode(tag: &str, raw: &str) -> Option<Self> {
        match tag {
            TAG_INT => raw.parse().ok().map(UserId::Integer),
            TAG_UNICODE => Some(UserId::Text(raw.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Integer(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for UserId {
    fn from(n: i64) -> Self {
        UserId::Integer(n)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId::Text(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        UserId::Text(s)
    }
}

/// Find the type tag embedded in `user_data`, if any.
pub fn find_type_tag(user_data: &str) -> Option<&str> {
    user_data
        .split(SEGMENT_SEPARATOR)
        .find_map(|segment| segment.strip_prefix(USERID_TYPE_PREFIX))
}

/// Recover the typed userid from the raw ticket userid and its user_data.
///
/// Falls back to the raw string when there is no tag or the tag is not recognized.
pub fn decode_userid(raw_userid: &str, user_data: &str) -> UserId {
    find_type_tag(user_data)
        .and_then(|tag| UserId::decode(tag, raw_userid))
        .unwrap_or_else(|| UserId::Text(raw_userid.to_string()))
}

/// Encode `userid` for a ticket and prefix its type tag onto `user_data`.
///
/// Any type segment already present in `user_data` is dropped so that at most one
/// tag ends up in the ticket. Returns `(encoded_userid, tagged_user_data)`.
pub fn encode_userid(userid: &UserId, user_data: &str) -> (String, String) {
    let (tag, encoded) = userid.encode();

    let mut tagged = format!("{USERID_TYPE_PREFIX}{tag}");
    for segment in user_data
        .split(SEGMENT_SEPARATOR)
        .filter(|s| !s.is_empty() && !s.starts_with(USERID_TYPE_PREFIX))
    {
        tagged.push(SEGMENT_SEPARATOR);
        tagged.push_str(segment);
    }

    (encoded, tagged)
}
