//! Refresh token record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A refresh token issued to a client for an account.
///
/// Refresh tokens are opaque server-side records; they rotate on use
/// (the presented token is consumed and a replacement issued).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// The opaque token value handed to the client.
    pub token: String,

    /// Account the token was issued for.
    pub account_id: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Grant backing this token.
    pub grant_id: uuid::Uuid,

    /// Scope granted at issuance (space-delimited). A refresh exchange
    /// may narrow but never widen this.
    pub scope: String,

    /// Timestamp when the token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl RefreshToken {
    /// Checks if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}
