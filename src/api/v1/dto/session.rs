/*
 * Responsibility
 * - session (login) / me の request/response DTO
 * - validation (形式チェック) は validate() で行う (ticket に載らない文字はここで弾く)
 */
use serde::{Deserialize, Serialize};

use crate::services::auth::{Identity, UserId, ticket};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    // JSON number -> Integer, string -> Text
    pub userid: UserId,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub userdata: String,
    pub max_age: Option<u64>,
}

impl CreateSessionRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let UserId::Text(s) = &self.userid
            && s.trim().is_empty()
        {
            return Err("userid is required");
        }
        if ticket::validate_fields(&self.tokens, &self.userdata).is_err() {
            return Err("tokens/userdata contain unsupported characters");
        }
        Ok(())
    }

    /// Candidate identity; the pipeline's authenticators decide whether it is accepted.
    pub fn into_identity(self) -> Identity {
        let identity = Identity::candidate(self.userid)
            .with_tokens(self.tokens)
            .with_userdata(self.userdata);

        match self.max_age {
            Some(max_age) => identity.with_max_age(max_age),
            None => identity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub userid: UserId,
    pub tokens: Vec<String>,
    pub userdata: String,
    pub issued_at: Option<i64>,
    pub auth_type: &'static str,
}
