//! Opaque access token record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A server-side record backing an opaque access token.
///
/// Opaque tokens are issued when the token request carries no resource
/// indicator; they are resolved by lookup at the userinfo endpoint
/// instead of by signature verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaqueAccessToken {
    /// The opaque token value handed to the client.
    pub token: String,

    /// Account the token was issued for.
    pub account_id: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Grant backing this token.
    pub grant_id: Uuid,

    /// Scope granted at issuance (space-delimited).
    pub scope: String,

    /// Timestamp when the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl OpaqueAccessToken {
    /// Checks if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}
